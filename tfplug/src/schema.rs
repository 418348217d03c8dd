//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider, resource and
//! data source schemas: attributes, nested blocks, and the schema-driven
//! operations the gRPC layer runs on config and state values (validation,
//! conforming state, marking computed values unknown).

use crate::defaults::{Default as AttributeDefault, DefaultRequest};
use crate::plan_modifier::{PlanModifier, RequiresReplaceIfChanged};
use crate::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

pub use crate::attribute_type::AttributeType;

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, Block>,
}

pub type ResourceSchema = Schema;
pub type DataSourceSchema = Schema;
pub type ProviderSchema = Schema;

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn AttributeDefault>>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("deprecated", &self.deprecated)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

// Trait objects are compared by count only
impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.r#type == other.r#type
            && self.description == other.description
            && self.required == other.required
            && self.optional == other.optional
            && self.computed == other.computed
            && self.sensitive == other.sensitive
            && self.deprecated == other.deprecated
            && self.validators.len() == other.validators.len()
            && self.plan_modifiers.len() == other.plan_modifiers.len()
            && self.default.is_some() == other.default.is_some()
    }
}

impl Attribute {
    /// Computed attributes the user cannot set
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

/// Block represents a nested configuration block such as `filter { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
    pub description: String,
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, Block>,
}

impl Block {
    /// The empty value Terraform expects when the block is absent
    fn empty_value(&self) -> Dynamic {
        match self.nesting {
            NestingMode::Single => Dynamic::Null,
            NestingMode::List | NestingMode::Set => Dynamic::List(Vec::new()),
        }
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn list(name: &str, elem: AttributeType) -> Self {
        Self::new(name, AttributeType::list_of(elem))
    }

    pub fn set(name: &str, elem: AttributeType) -> Self {
        Self::new(name, AttributeType::set_of(elem))
    }

    pub fn map(name: &str, elem: AttributeType) -> Self {
        Self::new(name, AttributeType::map_of(elem))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Changing the attribute destroys and recreates the resource
    pub fn requires_replace(self) -> Self {
        self.plan_modifier(RequiresReplaceIfChanged)
    }

    pub fn default(mut self, default: Arc<dyn AttributeDefault>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

impl From<AttributeBuilder> for Attribute {
    fn from(builder: AttributeBuilder) -> Self {
        builder.build()
    }
}

/// BlockBuilder builds nested blocks
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new(name: &str, nesting: NestingMode) -> Self {
        Self {
            block: Block {
                name: name.to_string(),
                nesting,
                min_items: 0,
                max_items: 0,
                description: String::new(),
                attributes: HashMap::new(),
                blocks: HashMap::new(),
            },
        }
    }

    pub fn single(name: &str) -> Self {
        Self::new(name, NestingMode::Single)
    }

    pub fn list(name: &str) -> Self {
        Self::new(name, NestingMode::List)
    }

    pub fn set(name: &str) -> Self {
        Self::new(name, NestingMode::Set)
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.block.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.block.max_items = max;
        self
    }

    pub fn attribute(mut self, attr: impl Into<Attribute>) -> Self {
        let attr = attr.into();
        self.block.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn block(mut self, block: impl Into<Block>) -> Self {
        let block = block.into();
        self.block.blocks.insert(block.name.clone(), block);
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}

impl From<BlockBuilder> for Block {
    fn from(builder: BlockBuilder) -> Self {
        builder.build()
    }
}

/// SchemaBuilder provides fluent API for building schemas
#[derive(Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: impl Into<Attribute>) -> Self {
        let attr = attr.into();
        self.schema.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn block(mut self, block: impl Into<Block>) -> Self {
        let block = block.into();
        self.schema.blocks.insert(block.name.clone(), block);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Schema {
    /// Checks a configuration against the schema: unknown fields, required
    /// fields, value types, block item counts and attribute validators.
    pub fn validate(&self, config: &DynamicValue) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        validate_object(
            &self.attributes,
            &self.blocks,
            &config.values,
            &AttributePath::root(),
            &mut diagnostics,
        );
        diagnostics
    }

    /// Shapes a value to exactly the schema's attributes: unknown keys are
    /// dropped, missing attributes become null and missing list blocks empty.
    pub fn conform(&self, value: &mut DynamicValue) {
        conform_object(&self.attributes, &self.blocks, &mut value.values);
    }

    /// Marks computed attributes without a configured value as unknown
    pub fn mark_computed_unknown(&self, plan: &mut DynamicValue, config: &DynamicValue) {
        for (name, attr) in &self.attributes {
            if !attr.computed {
                continue;
            }
            let configured = config.values.get(name).is_some_and(|v| !v.is_null());
            let planned = plan.values.get(name).is_some_and(|v| !v.is_null());
            if !configured && !planned {
                plan.set(name, Dynamic::Unknown);
            }
        }
    }

    /// Marks every computed attribute that is not configured and has no
    /// default as unknown, used when an update may change server-side values
    pub fn mark_unconfigured_computed_unknown(&self, plan: &mut DynamicValue, config: &DynamicValue) {
        for (name, attr) in &self.attributes {
            if !attr.computed || attr.default.is_some() {
                continue;
            }
            if !config.values.get(name).is_some_and(|v| !v.is_null()) {
                plan.set(name, Dynamic::Unknown);
            }
        }
    }

    /// Applies attribute defaults for optional values missing from config
    pub fn apply_defaults(&self, plan: &mut DynamicValue, config: &DynamicValue) {
        for (name, attr) in &self.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let configured = config.values.get(name).is_some_and(|v| !v.is_null());
            if attr.optional && !configured {
                let response = default.default_value(DefaultRequest {
                    attribute_path: name.clone(),
                });
                if !response.value.is_null() {
                    plan.set(name, response.value);
                }
            }
        }
    }
}

fn validate_object(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, Block>,
    values: &HashMap<String, Dynamic>,
    path: &AttributePath,
    diagnostics: &mut Diagnostics,
) {
    for (name, value) in values {
        if !attributes.contains_key(name) && !blocks.contains_key(name) {
            diagnostics.add_attribute_error(
                path.clone().attribute(name),
                format!("Unknown field: {}", name),
                Some(format!("The field '{}' is not defined in the schema", name)),
            );
        }
    }

    for (name, attr) in attributes {
        let attr_path = path.clone().attribute(name);
        let value = values.get(name).unwrap_or(&Dynamic::Null);

        if attr.required && value.is_null() {
            diagnostics.add_attribute_error(
                attr_path,
                format!("Missing required field: {}", name),
                Some(format!(
                    "The field '{}' is required but was not provided",
                    name
                )),
            );
            continue;
        }

        if attr.is_computed_only() && value.is_known() {
            diagnostics.add_attribute_error(
                attr_path,
                format!("Value for unconfigurable attribute: {}", name),
                Some(format!("The field '{}' is computed and cannot be set", name)),
            );
            continue;
        }

        if !attr.r#type.accepts(value) {
            diagnostics.add_attribute_error(
                attr_path,
                format!("Type mismatch for field: {}", name),
                Some(format!(
                    "Field '{}' expects type {} but got {}",
                    name,
                    attr.r#type.to_json(),
                    value.type_name()
                )),
            );
            continue;
        }

        if value.is_known() {
            let display_path = attr_path.to_string();
            for validator in &attr.validators {
                validator.validate(value, &display_path, diagnostics);
            }
        }
    }

    for (name, block) in blocks {
        let block_path = path.clone().attribute(name);
        let items: Vec<&HashMap<String, Dynamic>> = match values.get(name) {
            Some(Dynamic::List(items)) => items.iter().filter_map(Dynamic::as_map).collect(),
            Some(Dynamic::Map(m)) => vec![m],
            Some(Dynamic::Unknown) => continue,
            _ => Vec::new(),
        };

        let count = items.len() as i64;
        if count < block.min_items {
            diagnostics.add_attribute_error(
                block_path.clone(),
                format!("Insufficient {} blocks", name),
                Some(format!(
                    "At least {} \"{}\" blocks are required",
                    block.min_items, name
                )),
            );
        }
        if block.max_items > 0 && count > block.max_items {
            diagnostics.add_attribute_error(
                block_path.clone(),
                format!("Too many {} blocks", name),
                Some(format!(
                    "No more than {} \"{}\" blocks are allowed",
                    block.max_items, name
                )),
            );
        }

        for (idx, item) in items.into_iter().enumerate() {
            validate_object(
                &block.attributes,
                &block.blocks,
                item,
                &block_path.clone().index(idx as i64),
                diagnostics,
            );
        }
    }
}

fn conform_object(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, Block>,
    values: &mut HashMap<String, Dynamic>,
) {
    values.retain(|name, _| attributes.contains_key(name) || blocks.contains_key(name));

    for name in attributes.keys() {
        values.entry(name.clone()).or_insert(Dynamic::Null);
    }

    for (name, block) in blocks {
        let value = values
            .entry(name.clone())
            .or_insert_with(|| block.empty_value());

        if block.nesting == NestingMode::Single {
            if let Dynamic::List(items) = value {
                let first = items.drain(..).next().unwrap_or(Dynamic::Null);
                *value = first;
            }
        } else if value.is_null() {
            *value = Dynamic::List(Vec::new());
        }

        match value {
            Dynamic::Map(m) => conform_object(&block.attributes, &block.blocks, m),
            Dynamic::List(items) => {
                for item in items.iter_mut() {
                    if let Dynamic::Map(m) = item {
                        conform_object(&block.attributes, &block.blocks, m);
                    }
                }
            }
            _ => {}
        }
    }
}
