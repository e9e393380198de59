//! Structural nodes: attributes, blocks, bodies and files.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use hcl_tokenizer::Range;

use crate::Expression;

/// `name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
    pub range: Range,
    pub name_range: Range,
    pub equals_range: Range,
}

/// The attributes of a body, keyed by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    by_name: BTreeMap<String, Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute. If one with the same name exists, the existing
    /// attribute is kept and the new one is handed back.
    pub fn insert(&mut self, attr: Attribute) -> Result<(), Attribute> {
        if self.by_name.contains_key(&attr.name) {
            return Err(attr);
        }
        self.by_name.insert(attr.name.clone(), attr);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.by_name.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.by_name.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Attributes in the order they appear in the source.
    pub fn in_source_order(&self) -> Vec<&Attribute> {
        let mut attrs: Vec<&Attribute> = self.by_name.values().collect();
        attrs.sort_by_key(|attr| attr.name_range.start.byte);
        attrs
    }

    /// A range for the group as a whole: that of the first attribute in source order.
    pub fn range(&self) -> Option<&Range> {
        self.by_name
            .values()
            .min_by_key(|attr| attr.name_range.start.byte)
            .map(|attr| &attr.range)
    }

    fn map_exprs(self, f: &mut dyn FnMut(Expression) -> Expression) -> Self {
        let by_name = self
            .by_name
            .into_iter()
            .map(|(name, attr)| {
                let expr = f(attr.expr);
                (name, Attribute { expr, ..attr })
            })
            .collect();
        Attributes { by_name }
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::collections::btree_map::Values<'a, String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_name.values()
    }
}

/// `type "label" ... { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub labels: Vec<String>,
    pub body: Body,
    pub type_range: Range,
    pub label_ranges: Vec<Range>,
    pub open_brace_range: Range,
    pub close_brace_range: Range,
}

impl Block {
    /// From the type name to the closing brace.
    pub fn range(&self) -> Range {
        Range::between(&self.type_range, &self.close_brace_range)
    }

    /// The header: the type name and its labels, without the brace.
    pub fn def_range(&self) -> Range {
        let last = self.label_ranges.last().unwrap_or(&self.type_range);
        Range::between(&self.type_range, last)
    }
}

/// The blocks of a body in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blocks(Vec<Block>);

impl Blocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.0.push(block);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.0
    }

    /// Blocks whose type is `block_type`, in source order.
    pub fn of_type<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.0.iter().filter(move |b| b.block_type == block_type)
    }

    /// Blocks grouped by type, each group in source order.
    pub fn by_type(&self) -> BTreeMap<&str, Vec<&Block>> {
        let mut groups: BTreeMap<&str, Vec<&Block>> = BTreeMap::new();
        for block in &self.0 {
            groups.entry(&block.block_type).or_default().push(block);
        }
        groups
    }
}

impl<'a> IntoIterator for &'a Blocks {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Block> for Blocks {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Blocks(iter.into_iter().collect())
    }
}

/// The content of a file or of a block: attributes and nested blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub attributes: Attributes,
    pub blocks: Blocks,
    /// From the token before the content to the closing delimiter.
    pub range: Range,
    /// Zero-width, just past the closing delimiter.
    pub end_range: Range,
    /// Names already claimed by a partial schema extraction.
    pub(crate) hidden_attrs: BTreeSet<String>,
    pub(crate) hidden_blocks: BTreeSet<String>,
}

impl Body {
    /// A body with no content.
    pub fn empty(range: Range, end_range: Range) -> Self {
        Body {
            attributes: Attributes::new(),
            blocks: Blocks::new(),
            range,
            end_range,
            hidden_attrs: BTreeSet::new(),
            hidden_blocks: BTreeSet::new(),
        }
    }

    /// Rewrite every expression in the body, including those in nested blocks.
    pub fn transform<F>(self, f: &mut F) -> Body
    where
        F: FnMut(Expression) -> Expression,
    {
        let attributes = self.attributes.map_exprs(&mut |expr| expr.transform(f));
        let blocks = self
            .blocks
            .0
            .into_iter()
            .map(|block| Block {
                body: block.body.transform(f),
                ..block
            })
            .collect();
        Body {
            attributes,
            blocks,
            ..self
        }
    }
}

/// A parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub body: Body,
    pub bytes: Arc<[u8]>,
}

#[cfg(test)]
mod tests {
    use crate::{Expression, Value, parse_config};
    use hcl_tokenizer::Pos;

    const SRC: &str = r#"b = 2
a = 1
service "web" {
  port = 80
}
task {}
service "db" {}
"#;

    #[test]
    fn test_attribute_orders() {
        let (file, diags) = parse_config(SRC.as_bytes(), "body.hcl", Pos::START);
        assert!(diags.is_empty(), "{diags}");
        let attrs = &file.body.attributes;
        assert_eq!(attrs.names().collect::<Vec<_>>(), vec!["a", "b"]);
        let order: Vec<&str> = attrs.in_source_order().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(attrs.range().map(|r| r.start.byte), Some(0));
    }

    #[test]
    fn test_blocks_by_type() {
        let (file, _) = parse_config(SRC.as_bytes(), "body.hcl", Pos::START);
        let blocks = &file.body.blocks;
        assert_eq!(blocks.len(), 3);
        let labels: Vec<&str> = blocks
            .of_type("service")
            .map(|b| b.labels[0].as_str())
            .collect();
        assert_eq!(labels, vec!["web", "db"]);
        let groups = blocks.by_type();
        assert_eq!(groups["service"].len(), 2);
        assert_eq!(groups["task"].len(), 1);

        let web = &blocks.as_slice()[0];
        assert_eq!(web.def_range().start.byte, 12);
        assert_eq!(web.def_range().end.byte, 25);
        assert_eq!(web.def_range().end, web.label_ranges[0].end);
        assert_eq!(web.range().end.byte, 41);

        let task = &blocks.as_slice()[1];
        assert_eq!(task.def_range(), task.type_range);
        assert_eq!((task.def_range().start.byte, task.def_range().end.byte), (42, 46));
    }

    #[test]
    fn test_body_transform_reaches_nested_blocks() {
        let (file, _) = parse_config(SRC.as_bytes(), "body.hcl", Pos::START);
        let body = file.body.transform(&mut |expr| match expr {
            Expression::Literal { range, .. } => Expression::Literal {
                value: Value::from("x"),
                range,
            },
            other => other,
        });
        let port = body.blocks.as_slice()[0].body.attributes.get("port").unwrap();
        assert!(matches!(&port.expr, Expression::Literal { value, .. } if *value == Value::from("x")));
    }
}
