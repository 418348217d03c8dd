//! Protocol buffer types for Terraform Plugin Protocol v6.9
//!
//! Generated at build time from `proto/tfplugin6.9.proto`. Request and
//! response types live in snake_case modules named after their RPC, e.g.
//! `read_resource::Request`. Several types share names with framework types
//! (`DynamicValue`, `Diagnostic`, `AttributePath`, `Schema`), so refer to them
//! through the `proto::` prefix.

// Include the generated protobuf code from the build output directory
// The file name is based on the proto package name (tfplugin6)
include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::ProviderServer;
