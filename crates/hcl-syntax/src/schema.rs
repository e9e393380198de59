//! Schema-directed extraction of attributes and blocks from a [`Body`].

use std::collections::BTreeMap;

use hcl_tokenizer::Range;
use tracing::debug;

use crate::suggest::name_suggestion;
use crate::{Attributes, Blocks, Body, Diagnostic, Diagnostics};

/// An attribute a schema expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    pub name: String,
    pub required: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }
}

/// A block type a schema expects, with the names of its labels in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeaderSchema {
    pub block_type: String,
    pub label_names: Vec<String>,
}

impl BlockHeaderSchema {
    pub fn new<I, S>(block_type: impl Into<String>, label_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            block_type: block_type.into(),
            label_names: label_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// The attributes and blocks a body is expected to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodySchema {
    pub attributes: Vec<AttributeSchema>,
    pub blocks: Vec<BlockHeaderSchema>,
}

impl BodySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, attr: AttributeSchema) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn with_block(mut self, block: BlockHeaderSchema) -> Self {
        self.blocks.push(block);
        self
    }
}

/// What a schema extracted from a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyContent {
    pub attributes: Attributes,
    pub blocks: Blocks,
    /// Where to point diagnostics about content the body lacks.
    pub missing_item_range: Range,
}

impl Body {
    /// Zero-width range at the start of the body, used as the subject of
    /// "missing" diagnostics.
    pub fn missing_item_range(&self) -> Range {
        self.range.empty_at_start()
    }

    /// Extract exactly what `schema` describes. Anything else in the body,
    /// not already claimed by an earlier [`Body::partial_content`], is an
    /// error.
    pub fn content(&self, schema: &BodySchema) -> (BodyContent, Diagnostics) {
        let (content, remain, mut diags) = self.partial_content(schema);
        let block_types: Vec<&str> = schema.blocks.iter().map(|b| b.block_type.as_str()).collect();

        for attr in self.attributes.in_source_order() {
            if remain.hidden_attrs.contains(&attr.name) {
                continue;
            }
            if block_types.contains(&attr.name.as_str()) {
                // already reported by partial_content
                continue;
            }
            let unclaimed = schema
                .attributes
                .iter()
                .map(|a| a.name.as_str())
                .filter(|name| !content.attributes.contains_key(name));
            let suggestion = match name_suggestion(&attr.name, unclaimed) {
                Some(s) => format!(" Did you mean {:?}?", s),
                None => String::new(),
            };
            diags.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!(
                        "An argument named {:?} is not expected here.{}",
                        attr.name, suggestion
                    ),
                )
                .with_subject(attr.name_range.clone()),
            );
        }

        for block in &self.blocks {
            if remain.hidden_blocks.contains(&block.block_type) {
                continue;
            }
            let suggestion = match name_suggestion(&block.block_type, block_types.iter().copied()) {
                Some(s) => format!(" Did you mean {:?}?", s),
                None if schema.attributes.iter().any(|a| a.name == block.block_type) => format!(
                    " Did you mean to define argument {:?}? If so, use the equals sign to assign it a value.",
                    block.block_type
                ),
                None => String::new(),
            };
            diags.push(
                Diagnostic::error(
                    "Unsupported block type",
                    format!(
                        "Blocks of type {:?} are not expected here.{}",
                        block.block_type, suggestion
                    ),
                )
                .with_subject(block.type_range.clone()),
            );
        }

        debug!(
            attributes = content.attributes.len(),
            blocks = content.blocks.len(),
            diagnostics = diags.len(),
            "extracted body content"
        );
        (content, diags)
    }

    /// Extract what `schema` describes and return the rest of the body.
    ///
    /// The returned body hides everything claimed here, so a later call
    /// with another schema sees only what is left. Attributes not in the
    /// schema are ignored rather than reported.
    pub fn partial_content(&self, schema: &BodySchema) -> (BodyContent, Body, Diagnostics) {
        let mut attributes = Attributes::new();
        let mut blocks = Blocks::new();
        let mut diags = Diagnostics::new();
        let mut hidden_attrs = self.hidden_attrs.clone();
        let mut hidden_blocks = self.hidden_blocks.clone();

        for attr_schema in &schema.attributes {
            let name = &attr_schema.name;
            let found = self
                .attributes
                .get(name)
                .filter(|_| !hidden_attrs.contains(name));
            let Some(attr) = found else {
                if attr_schema.required {
                    diags.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!(
                                "The argument {:?} is required, but no definition was found.",
                                name
                            ),
                        )
                        .with_subject(self.missing_item_range()),
                    );
                }
                continue;
            };
            hidden_attrs.insert(name.clone());
            // names are unique in the source map
            let _ = attributes.insert(attr.clone());
        }

        let wanted: BTreeMap<&str, &BlockHeaderSchema> = schema
            .blocks
            .iter()
            .map(|b| (b.block_type.as_str(), b))
            .collect();

        for attr in self.attributes.in_source_order() {
            if hidden_attrs.contains(&attr.name) || !wanted.contains_key(attr.name.as_str()) {
                continue;
            }
            diags.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!(
                        "An argument named {:?} is not expected here. Did you mean to define a block of type {:?}?",
                        attr.name, attr.name
                    ),
                )
                .with_subject(attr.name_range.clone()),
            );
        }

        for block in &self.blocks {
            if hidden_blocks.contains(&block.block_type) {
                continue;
            }
            let Some(block_schema) = wanted.get(block.block_type.as_str()) else {
                continue;
            };
            let want = block_schema.label_names.len();
            let header = Range::between(&block.type_range, &block.open_brace_range);

            if block.labels.len() > want {
                let name = &block.block_type;
                let detail = if want == 0 {
                    format!("No labels are expected for {} blocks.", name)
                } else {
                    format!(
                        "Only {} labels ({}) are expected for {} blocks.",
                        want,
                        block_schema.label_names.join(", "),
                        name
                    )
                };
                diags.push(
                    Diagnostic::error(format!("Extraneous label for {}", name), detail)
                        .with_subject(block.label_ranges[want].clone())
                        .with_context(header),
                );
                continue;
            }
            if block.labels.len() < want {
                let name = &block.block_type;
                diags.push(
                    Diagnostic::error(
                        format!(
                            "Missing {} for {}",
                            block_schema.label_names[block.labels.len()],
                            name
                        ),
                        format!(
                            "All {} blocks must have {} labels ({}).",
                            name,
                            want,
                            block_schema.label_names.join(", ")
                        ),
                    )
                    .with_subject(block.open_brace_range.clone())
                    .with_context(header),
                );
                continue;
            }
            blocks.push(block.clone());
        }

        // hidden only now, so every block of a claimed type is collected
        hidden_blocks.extend(schema.blocks.iter().map(|b| b.block_type.clone()));

        let mut remain = self.clone();
        remain.hidden_attrs = hidden_attrs;
        remain.hidden_blocks = hidden_blocks;

        let content = BodyContent {
            attributes,
            blocks,
            missing_item_range: self.missing_item_range(),
        };
        (content, remain, diags)
    }

    /// Treat the body as a flat map of attributes. Blocks are an error here;
    /// only the first is reported, and the attributes are returned anyway.
    pub fn just_attributes(&self) -> (Attributes, Diagnostics) {
        let mut diags = Diagnostics::new();
        if let Some(example) = self.blocks.iter().next() {
            diags.push(
                Diagnostic::error(
                    format!("Unexpected {:?} block", example.block_type),
                    "Blocks are not allowed here.",
                )
                .with_subject(example.type_range.clone()),
            );
        }

        let mut attrs = Attributes::new();
        for attr in self.attributes.iter() {
            if !self.hidden_attrs.contains(&attr.name) {
                let _ = attrs.insert(attr.clone());
            }
        }
        (attrs, diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pos, parse_config};

    fn body(src: &str) -> Body {
        let (file, diags) = parse_config(src.as_bytes(), "schema.hcl", Pos::START);
        assert!(diags.is_empty(), "{diags}");
        file.body
    }

    fn summaries(diags: &Diagnostics) -> Vec<&str> {
        diags.iter().map(|d| d.summary.as_str()).collect()
    }

    #[test]
    fn test_content_collects_attributes_and_blocks() {
        let b = body("name = \"x\"\nservice \"a\" {}\nservice \"b\" {}\n");
        let schema = BodySchema::new()
            .with_attribute(AttributeSchema::required("name"))
            .with_block(BlockHeaderSchema::new("service", ["name"]));
        let (content, diags) = b.content(&schema);
        assert!(diags.is_empty(), "{diags}");
        assert!(content.attributes.contains_key("name"));
        assert_eq!(content.blocks.len(), 2);
    }

    #[test]
    fn test_missing_required_argument() {
        let b = body("");
        let schema = BodySchema::new().with_attribute(AttributeSchema::required("name"));
        let (content, diags) = b.content(&schema);
        assert!(content.attributes.is_empty());
        assert_eq!(summaries(&diags), ["Missing required argument"]);
        assert_eq!(diags[0].subject.as_ref(), Some(&b.missing_item_range()));
        assert_eq!(content.missing_item_range, b.missing_item_range());
    }

    #[test]
    fn test_optional_attribute_may_be_absent() {
        let b = body("");
        let schema = BodySchema::new().with_attribute(AttributeSchema::new("name"));
        let (_, diags) = b.content(&schema);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unsupported_argument_suggestions() {
        let b = body("nmae = 1\nservice = 2\n");
        let schema = BodySchema::new()
            .with_attribute(AttributeSchema::new("name"))
            .with_block(BlockHeaderSchema::new("service", Vec::<String>::new()));
        let (_, diags) = b.content(&schema);
        assert_eq!(
            summaries(&diags),
            ["Unsupported argument", "Unsupported argument"]
        );
        let details: Vec<&str> = diags.iter().map(|d| d.detail.as_str()).collect();
        assert!(details.contains(&"An argument named \"service\" is not expected here. Did you mean to define a block of type \"service\"?"));
        assert!(details.contains(&"An argument named \"nmae\" is not expected here. Did you mean \"name\"?"));
    }

    #[test]
    fn test_unsupported_block_suggestions() {
        let b = body("servce {}\nname {}\nzzz {}\n");
        let schema = BodySchema::new()
            .with_attribute(AttributeSchema::new("name"))
            .with_block(BlockHeaderSchema::new("service", Vec::<String>::new()));
        let (_, diags) = b.content(&schema);
        let details: Vec<&str> = diags.iter().map(|d| d.detail.as_str()).collect();
        assert_eq!(
            details,
            [
                "Blocks of type \"servce\" are not expected here. Did you mean \"service\"?",
                "Blocks of type \"name\" are not expected here. Did you mean to define argument \"name\"? If so, use the equals sign to assign it a value.",
                "Blocks of type \"zzz\" are not expected here.",
            ]
        );
    }

    #[test]
    fn test_label_count_mismatch() {
        let b = body("a {}\nb \"x\" \"y\" {}\nc \"x\" {}\n");
        let schema = BodySchema::new()
            .with_block(BlockHeaderSchema::new("a", ["name"]))
            .with_block(BlockHeaderSchema::new("b", ["name"]))
            .with_block(BlockHeaderSchema::new("c", Vec::<String>::new()));
        let (content, diags) = b.content(&schema);
        assert!(content.blocks.is_empty());
        assert_eq!(
            summaries(&diags),
            ["Missing name for a", "Extraneous label for b", "Extraneous label for c"]
        );
        assert_eq!(diags[1].detail, "Only 1 labels (name) are expected for b blocks.");
        assert_eq!(diags[2].detail, "No labels are expected for c blocks.");
        let subject = diags[1].subject.as_ref().unwrap();
        assert_eq!(subject.start.column, 7);
    }

    #[test]
    fn test_partial_content_is_idempotent() {
        let b = body("a = 1\nb = 2\nx {}\ny {}\n");
        let first = BodySchema::new()
            .with_attribute(AttributeSchema::new("a"))
            .with_block(BlockHeaderSchema::new("x", Vec::<String>::new()));
        let (c1, remain, diags) = b.partial_content(&first);
        assert!(diags.is_empty());

        // claiming the same names again finds nothing
        let (again, _, diags) = remain.partial_content(&first);
        assert!(diags.is_empty());
        assert!(again.attributes.is_empty());
        assert!(again.blocks.is_empty());

        let second = BodySchema::new()
            .with_attribute(AttributeSchema::new("b"))
            .with_block(BlockHeaderSchema::new("y", Vec::<String>::new()));
        let (c2, diags) = remain.content(&second);
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(c1.attributes.names().collect::<Vec<_>>(), ["a"]);
        assert_eq!(c2.attributes.names().collect::<Vec<_>>(), ["b"]);
        assert_eq!(c1.blocks.as_slice()[0].block_type, "x");
        assert_eq!(c2.blocks.as_slice()[0].block_type, "y");
    }

    #[test]
    fn test_claimed_required_attribute_is_missing_later() {
        let b = body("a = 1\n");
        let schema = BodySchema::new().with_attribute(AttributeSchema::required("a"));
        let (_, remain, _) = b.partial_content(&schema);
        let (_, _, diags) = remain.partial_content(&schema);
        assert_eq!(summaries(&diags), ["Missing required argument"]);
    }

    #[test]
    fn test_just_attributes() {
        let b = body("a = 1\nx {}\ny {}\n");
        let (attrs, diags) = b.just_attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(summaries(&diags), ["Unexpected \"x\" block"]);

        let schema = BodySchema::new().with_attribute(AttributeSchema::new("a"));
        let (_, remain, _) = b.partial_content(&schema);
        let (attrs, _) = remain.just_attributes();
        assert!(attrs.is_empty());
    }
}
