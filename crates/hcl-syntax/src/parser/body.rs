//! Bodies: attributes, blocks and their labels.

use hcl_tokenizer::{Range, Token, TokenType};

use super::Parser;
use super::literal::unescape_literal;
use crate::{Attribute, Attributes, Block, Blocks, Body, Diagnostic, Diagnostics};

enum BodyItem {
    Attribute(Attribute),
    Block(Block),
}

impl<'src> Parser<'src> {
    /// Parse body items until `end`, which is consumed. Use
    /// [`TokenType::Eof`] for a whole file and [`TokenType::CBrace`] for the
    /// inside of a block.
    pub fn parse_body(&mut self, end: TokenType) -> (Body, Diagnostics) {
        let mut attributes = Attributes::new();
        let mut blocks = Blocks::new();
        let mut diags = Diagnostics::new();
        let start_range = self.prev_range();

        let end_range = loop {
            let next = self.peek();
            if next.kind == end {
                self.read();
                break next.range;
            }

            match next.kind {
                TokenType::Newline => {
                    self.read();
                }
                TokenType::Ident => {
                    let (item, d) = self.parse_body_item();
                    diags.extend(d);
                    match item {
                        Some(BodyItem::Block(block)) => blocks.push(block),
                        Some(BodyItem::Attribute(attr)) => {
                            if let Err(attr) = attributes.insert(attr) {
                                let existing =
                                    attributes.get(&attr.name).map(|a| a.name_range.clone());
                                let at = existing.as_ref().map(Range::to_string).unwrap_or_default();
                                let mut diag = Diagnostic::error(
                                    "Attribute redefined",
                                    format!(
                                        "The argument {:?} was already set at {}. Each argument may be set only once.",
                                        attr.name, at
                                    ),
                                )
                                .with_subject(attr.name_range);
                                if let Some(existing) = existing {
                                    diag = diag.with_context(existing);
                                }
                                diags.push(diag);
                            }
                        }
                        // the item already reported its error and recovered
                        None => {}
                    }
                }
                _ => {
                    let bad = self.read();
                    if !self.recovery {
                        let diag = match bad.kind {
                            TokenType::OQuote => Diagnostic::error(
                                "Invalid argument name",
                                "Argument names must not be quoted.",
                            )
                            .with_subject(bad.range.clone()),
                            TokenType::Eof => Diagnostic::error(
                                "Unclosed configuration block",
                                "There is no closing brace for this block before the end of the file. This may be caused by incorrect brace nesting elsewhere in this file.",
                            )
                            .with_subject(start_range.clone()),
                            _ => Diagnostic::error(
                                "Argument or block definition required",
                                "An argument or block definition is required here.",
                            )
                            .with_subject(bad.range.clone()),
                        };
                        diags.push(diag);
                    }
                    let end_range = self.prev_range();
                    self.recover(end);
                    break end_range;
                }
            }
        };

        let mut body = Body::empty(
            Range::between(&start_range, &end_range),
            end_range.empty_at_end(),
        );
        body.attributes = attributes;
        body.blocks = blocks;
        (body, diags)
    }

    fn parse_body_item(&mut self) -> (Option<BodyItem>, Diagnostics) {
        let ident = self.read();
        if ident.kind != TokenType::Ident {
            self.recover_after_body_item();
            return (None, definition_required(&ident, false).into());
        }

        match self.peek().kind {
            TokenType::Equal => {
                let (attr, diags) = self.finish_parsing_body_attribute(ident, false);
                (Some(BodyItem::Attribute(attr)), diags)
            }
            TokenType::OQuote | TokenType::OBrace | TokenType::Ident => {
                let (block, diags) = self.finish_parsing_body_block(ident);
                (Some(BodyItem::Block(block)), diags)
            }
            _ => {
                self.recover_after_body_item();
                (None, definition_required(&ident, true).into())
            }
        }
    }

    fn finish_parsing_body_attribute(
        &mut self,
        ident: Token<'src>,
        single_line: bool,
    ) -> (Attribute, Diagnostics) {
        let equals = self.read();
        let (expr, mut diags) = self.parse_expression();

        let end_range = if self.recovery && diags.has_errors() {
            self.recover_after_body_item();
            expr.range().clone()
        } else {
            let end_range = self.prev_range();
            if !single_line {
                let end = self.peek();
                if end.kind != TokenType::Newline && end.kind != TokenType::Eof {
                    if !self.recovery {
                        let (summary, detail) = if end.kind == TokenType::Comma {
                            (
                                "Unexpected comma after argument",
                                "Argument definitions must be separated by newlines, not commas. An argument definition must end with a newline.",
                            )
                        } else {
                            (
                                "Missing newline after argument",
                                "An argument definition must end with a newline.",
                            )
                        };
                        diags.push(
                            Diagnostic::error(summary, detail)
                                .with_subject(end.range.clone())
                                .with_context(Range::between(&ident.range, &end.range)),
                        );
                    }
                    self.recover_after_body_item();
                } else {
                    self.read();
                }
            }
            end_range
        };

        let attr = Attribute {
            name: ident.text().into_owned(),
            expr,
            range: Range::between(&ident.range, &end_range),
            name_range: ident.range,
            equals_range: equals.range,
        };
        (attr, diags)
    }

    fn finish_parsing_body_block(&mut self, ident: Token<'src>) -> (Block, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut labels = Vec::new();
        let mut label_ranges = Vec::new();

        let open_brace = loop {
            let tok = self.peek();
            match tok.kind {
                TokenType::OBrace => break self.read(),
                TokenType::OQuote => {
                    let (label, range, d) = self.parse_quoted_string_literal();
                    diags.extend(d);
                    labels.push(label);
                    label_ranges.push(range);
                }
                TokenType::Ident => {
                    let tok = self.read();
                    labels.push(tok.text().into_owned());
                    label_ranges.push(tok.range);
                }
                _ => {
                    let detail = match tok.kind {
                        TokenType::Equal => Some(
                            "The equals sign \"=\" indicates an argument definition, and must not be used when defining a block.",
                        ),
                        TokenType::Newline => Some(
                            "A block definition must have block content delimited by \"{\" and \"}\", starting on the same line as the block header.",
                        ),
                        _ if !self.recovery => Some(
                            "Either a quoted string block label or an opening brace (\"{\") is expected here.",
                        ),
                        _ => None,
                    };
                    if let Some(detail) = detail {
                        diags.push(
                            Diagnostic::error("Invalid block definition", detail)
                                .with_subject(tok.range.clone())
                                .with_context(Range::between(&ident.range, &tok.range)),
                        );
                    }
                    self.recover_after_body_item();

                    // placeholder so callers can still inspect the header
                    let block = Block {
                        block_type: ident.text().into_owned(),
                        labels,
                        body: Body::empty(ident.range.clone(), ident.range.clone()),
                        type_range: ident.range.clone(),
                        label_ranges,
                        open_brace_range: ident.range.clone(),
                        close_brace_range: ident.range,
                    };
                    return (block, diags);
                }
            }
        };

        let (body, body_diags) = match self.peek().kind {
            TokenType::Newline | TokenType::Eof | TokenType::CBrace => {
                let (body, d) = self.parse_body(TokenType::CBrace);
                (Some(body), d)
            }
            _ => {
                // single-line block: `name { attr = value }`
                let (body, d) = self.parse_single_attr_body();
                if body.is_none() || (self.recovery && d.has_errors()) {
                    // the attribute already recovered past the end of the line
                    diags.extend(d);
                    let close_brace_range = self.prev_range();
                    let block = Block {
                        block_type: ident.text().into_owned(),
                        labels,
                        body: body.unwrap_or_else(|| {
                            Body::empty(
                                Range::between(&open_brace.range, &close_brace_range),
                                close_brace_range.empty_at_end(),
                            )
                        }),
                        type_range: ident.range,
                        label_ranges,
                        open_brace_range: open_brace.range,
                        close_brace_range,
                    };
                    return (block, diags);
                }
                diags.extend(self.finish_single_line_block());
                (body, d)
            }
        };
        diags.extend(body_diags);
        let close_brace_range = self.prev_range();

        let eol = self.peek();
        if eol.kind == TokenType::Newline || eol.kind == TokenType::Eof {
            self.read();
        } else {
            if !self.recovery {
                diags.push(
                    Diagnostic::error(
                        "Missing newline after block definition",
                        "A block definition must end with a newline.",
                    )
                    .with_subject(eol.range.clone())
                    .with_context(Range::between(&ident.range, &eol.range)),
                );
            }
            self.recover_after_body_item();
        }

        let body = body.unwrap_or_else(|| {
            Body::empty(
                Range::between(&open_brace.range, &close_brace_range),
                close_brace_range.empty_at_end(),
            )
        });
        let block = Block {
            block_type: ident.text().into_owned(),
            labels,
            body,
            type_range: ident.range,
            label_ranges,
            open_brace_range: open_brace.range,
            close_brace_range,
        };
        (block, diags)
    }

    /// Expect the `}` that closes a single-line block.
    fn finish_single_line_block(&mut self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let next = self.peek();
        let detail = match next.kind {
            TokenType::CBrace => {
                self.read();
                None
            }
            TokenType::Comma => Some(
                "Single-line block syntax can include only one argument definition. To define multiple arguments, use the multi-line block syntax with one argument definition per line.",
            ),
            TokenType::Newline => Some(
                "An argument definition on the same line as its containing block creates a single-line block definition, which must also be closed on the same line. Place the block's closing brace immediately after the argument definition.",
            ),
            _ if !self.recovery => Some(
                "A single-line block definition must end with a closing brace immediately after its single argument definition.",
            ),
            _ => {
                self.recover(TokenType::CBrace);
                None
            }
        };
        if let Some(detail) = detail {
            diags.push(
                Diagnostic::error("Invalid single-argument block definition", detail)
                    .with_subject(next.range),
            );
            self.recover(TokenType::CBrace);
        }
        diags
    }

    /// The body of a single-line block, which holds exactly one attribute.
    fn parse_single_attr_body(&mut self) -> (Option<Body>, Diagnostics) {
        let ident = self.read();
        if ident.kind != TokenType::Ident {
            self.recover_after_body_item();
            return (None, definition_required(&ident, false).into());
        }

        let next = self.peek();
        match next.kind {
            TokenType::Equal => {
                let (attr, diags) = self.finish_parsing_body_attribute(ident, true);
                let mut body = Body::empty(attr.range.clone(), attr.range.empty_at_end());
                // a fresh map cannot reject the insert
                let _ = body.attributes.insert(attr);
                (Some(body), diags)
            }
            TokenType::OQuote | TokenType::OBrace | TokenType::Ident => {
                self.recover_after_body_item();
                let diag = Diagnostic::error(
                    "Argument definition required",
                    format!(
                        "A single-line block definition can contain only a single argument. If you meant to define argument {:?}, use an equals sign to assign it a value. To define a nested block, place it on a line of its own within its parent block.",
                        ident.text()
                    ),
                )
                .with_subject(Range::between(&ident.range, &next.range));
                (None, diag.into())
            }
            _ => {
                self.recover_after_body_item();
                (None, definition_required(&ident, true).into())
            }
        }
    }

    /// A block label in quotes. Template sequences are not allowed.
    fn parse_quoted_string_literal(&mut self) -> (String, Range, Diagnostics) {
        let open = self.read();
        let mut diags = Diagnostics::new();
        let mut out = String::new();

        let end_range = loop {
            let tok = self.read();
            match tok.kind {
                TokenType::CQuote => break tok.range,
                TokenType::QuotedLit => {
                    let (s, d) = unescape_literal(&tok);
                    diags.extend(d);
                    out.push_str(&s);
                }
                TokenType::TemplateInterp | TokenType::TemplateControl => {
                    let which = if tok.kind == TokenType::TemplateControl {
                        '%'
                    } else {
                        '$'
                    };
                    diags.push(
                        Diagnostic::error(
                            "Invalid string literal",
                            format!(
                                "Template sequences are not allowed in this string. To include a literal {:?}, double it (as \"{}{}\") to escape it.",
                                which.to_string(),
                                which,
                                which
                            ),
                        )
                        .with_subject(tok.range.clone())
                        .with_context(Range::between(&open.range, &tok.range)),
                    );
                    // marks the partial label as damaged
                    out.push(which);
                    out.push_str("{ ... }");
                    self.recover(TokenType::TemplateSeqEnd);
                }
                TokenType::Eof => {
                    diags.push(
                        Diagnostic::error(
                            "Unterminated template string",
                            "No closing marker was found for the string.",
                        )
                        .with_subject(open.range.clone())
                        .with_context(Range::between(&open.range, &tok.range)),
                    );
                    break tok.range;
                }
                _ => {
                    diags.push(
                        Diagnostic::error(
                            "Invalid string literal",
                            "This item is not valid in a string literal.",
                        )
                        .with_subject(tok.range.clone())
                        .with_context(Range::between(&open.range, &tok.range)),
                    );
                    self.recover(TokenType::CQuote);
                    break tok.range;
                }
            }
        };
        (out, Range::between(&open.range, &end_range), diags)
    }
}

fn definition_required(ident: &Token<'_>, after_name: bool) -> Diagnostic {
    let detail = if after_name {
        "An argument or block definition is required here. To set an argument, use the equals sign \"=\" to introduce the argument value."
    } else {
        "An argument or block definition is required here."
    };
    Diagnostic::error("Argument or block definition required", detail)
        .with_subject(ident.range.clone())
}
