use vultr::VultrProvider;

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    tfplug::serve_default(VultrProvider::new()).await
}
