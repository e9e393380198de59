//! End-to-end: parse a configuration file, pick it apart with schemas, and
//! evaluate what is left.

use hcl_syntax::{
    AttributeSchema, BlockHeaderSchema, BodySchema, EvalContext, Pos, Value, parse_config,
    parse_expression, parse_template,
};

const SERVICE: &str = r#"
# Top-level settings.
region = "eu-west-1"

variable "image" {
  default = "nginx"
}

service "web" {
  replicas = 2 * scale
  image    = "${var.image}:${tag}"
  ports    = [for p in base_ports : p + offset]

  env {
    LOG = upper("debug")
  }
}
"#;

fn ctx() -> EvalContext<'static> {
    let mut var = std::collections::BTreeMap::new();
    var.insert("image".to_string(), Value::String("nginx".into()));
    EvalContext::new()
        .with_variable("var", Value::Object(var))
        .with_variable("scale", Value::Number(3.0))
        .with_variable("tag", Value::String("1.25".into()))
        .with_variable(
            "base_ports",
            Value::Tuple(vec![Value::Number(80.0), Value::Number(443.0)]),
        )
        .with_variable("offset", Value::Number(8000.0))
        .with_function("upper", |args: &[Value]| match args {
            [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
            _ => Err("expected one string".to_string()),
        })
}

#[test]
fn decodes_a_service_file() {
    let (file, diags) = parse_config(SERVICE.as_bytes(), "service.hcl", Pos::START);
    assert!(diags.is_empty(), "{diags}");

    let root = BodySchema::new()
        .with_attribute(AttributeSchema::required("region"))
        .with_block(BlockHeaderSchema::new("variable", ["name"]))
        .with_block(BlockHeaderSchema::new("service", ["name"]));
    let (content, diags) = file.body.content(&root);
    assert!(diags.is_empty(), "{diags}");

    let (region, _) = content.attributes.get("region").unwrap().expr.value(None);
    assert_eq!(region, Value::String("eu-west-1".into()));

    let services: Vec<_> = content.blocks.of_type("service").collect();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].labels, ["web"]);

    let service_schema = BodySchema::new()
        .with_attribute(AttributeSchema::required("replicas"))
        .with_attribute(AttributeSchema::required("image"))
        .with_attribute(AttributeSchema::new("ports"))
        .with_block(BlockHeaderSchema::new("env", Vec::<String>::new()));
    let (service, diags) = services[0].body.content(&service_schema);
    assert!(diags.is_empty(), "{diags}");

    let ctx = ctx();
    let value = |name: &str| {
        let (v, diags) = service.attributes.get(name).unwrap().expr.value(Some(&ctx));
        assert!(diags.is_empty(), "{diags}");
        v
    };
    assert_eq!(value("replicas"), Value::Number(6.0));
    assert_eq!(value("image"), Value::String("nginx:1.25".into()));
    assert_eq!(
        value("ports"),
        Value::Tuple(vec![Value::Number(8080.0), Value::Number(8443.0)])
    );

    let env = service.blocks.iter().next().unwrap();
    let (attrs, diags) = env.body.just_attributes();
    assert!(diags.is_empty());
    let (log, _) = attrs.get("LOG").unwrap().expr.value(Some(&ctx));
    assert_eq!(log, Value::String("DEBUG".into()));
}

#[test]
fn variables_lists_free_references_only() {
    let (file, _) = parse_config(SERVICE.as_bytes(), "service.hcl", Pos::START);
    let service = file.body.blocks.of_type("service").next().unwrap();
    let ports = service.body.attributes.get("ports").unwrap();
    let roots: Vec<_> = ports
        .expr
        .variables()
        .iter()
        .filter_map(|t| t.root_name().map(str::to_string))
        .collect();
    assert_eq!(roots, ["base_ports", "offset"]);
}

#[test]
fn partial_content_splits_a_body_between_two_schemas() {
    let src = b"name = \"a\"\nsize = 3\nextra = true\n";
    let (file, diags) = parse_config(src, "split.hcl", Pos::START);
    assert!(diags.is_empty());

    let first = BodySchema::new().with_attribute(AttributeSchema::required("name"));
    let (claimed, remain, diags) = file.body.partial_content(&first);
    assert!(diags.is_empty());
    assert!(claimed.attributes.contains_key("name"));

    // the same schema again finds nothing and does not complain
    let optional = BodySchema::new().with_attribute(AttributeSchema::new("name"));
    let (again, _, diags) = remain.partial_content(&optional);
    assert!(diags.is_empty());
    assert!(again.attributes.is_empty());

    let second = BodySchema::new().with_attribute(AttributeSchema::new("size"));
    let (rest, diags) = remain.content(&second);
    assert!(rest.attributes.contains_key("size"));
    let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
    assert_eq!(summaries, ["Unsupported argument"]);
    assert!(diags[0].detail.contains("\"extra\""));
}

#[test]
fn missing_required_argument_points_at_body_start() {
    let (file, _) = parse_config(b"x = 1\n", "req.hcl", Pos::START);
    let schema = BodySchema::new()
        .with_attribute(AttributeSchema::new("x"))
        .with_attribute(AttributeSchema::required("name"));
    let (content, diags) = file.body.content(&schema);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].summary, "Missing required argument");
    assert_eq!(diags[0].subject.as_ref(), Some(&content.missing_item_range));
    assert_eq!(content.missing_item_range, file.body.missing_item_range());
    assert!(content.missing_item_range.is_empty());
}

#[test]
fn binary_operators_fold_left() {
    let (expr, diags) = parse_expression(b"10 - 4 - 3", "expr.hcl", Pos::START);
    assert!(diags.is_empty());
    let (value, _) = expr.value(None);
    assert_eq!(value, Value::Number(3.0));

    let (expr, _) = parse_expression(b"1 + 2 * 3 == 7 && !false", "expr.hcl", Pos::START);
    let (value, _) = expr.value(None);
    assert_eq!(value, Value::Bool(true));
}

#[test]
fn template_file_with_directives() {
    let src = b"%{ for name in names ~}\n- ${name}\n%{ endfor ~}\n%{ if done }ok%{ else }pending%{ endif }";
    let (expr, diags) = parse_template(src, "list.tmpl", Pos::START);
    assert!(diags.is_empty(), "{diags}");
    let ctx = EvalContext::new()
        .with_variable(
            "names",
            Value::Tuple(vec![Value::String("a".into()), Value::String("b".into())]),
        )
        .with_variable("done", Value::Bool(false));
    let (value, diags) = expr.value(Some(&ctx));
    assert!(diags.is_empty(), "{diags}");
    assert_eq!(value, Value::String("- a\n- b\npending".into()));
}

#[test]
fn heredoc_attribute() {
    let src = b"script = <<-EOT\n    echo hi\n      exit 0\n    EOT\n";
    let (file, diags) = parse_config(src, "heredoc.hcl", Pos::START);
    assert!(diags.is_empty(), "{diags}");
    let (value, _) = file.body.attributes.get("script").unwrap().expr.value(None);
    assert_eq!(value, Value::String("echo hi\n  exit 0\n".into()));
}

#[test]
fn broken_file_still_yields_a_tree() {
    let src = b"a = [1 2]\nb = 3\nb = 4\nc {\n  d = 5\n}\n";
    let (file, diags) = parse_config(src, "broken.hcl", Pos::START);
    let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
    assert_eq!(summaries, ["Missing item separator", "Attribute redefined"]);
    assert!(file.body.attributes.contains_key("a"));
    let (b, _) = file.body.attributes.get("b").unwrap().expr.value(None);
    assert_eq!(b, Value::Number(3.0));
    assert_eq!(file.body.blocks.len(), 1);
}
