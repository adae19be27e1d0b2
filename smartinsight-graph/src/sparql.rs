//! SPARQL subset for tenant-scoped SELECT and CONSTRUCT queries
//!
//! Supported surface: `PREFIX` declarations, `SELECT [DISTINCT] ?vars|*`,
//! `CONSTRUCT { template }`, basic graph patterns, an optional
//! `GRAPH <uri> { ... }` clause, `FILTER` comparisons and
//! `FILTER regex(?var, "...")`, `LIMIT`, and `OFFSET`. The dataset handed
//! to the executor is already restricted to the calling tenant, so a query
//! can never observe another tenant's graphs; a `GRAPH` clause only narrows
//! further.

use serde::{Deserialize, Serialize};
use smartinsight_core::{ontology, Triple};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{GraphError, Result};

/// Upper bound on intermediate bindings during BGP joins
const MAX_BINDINGS: usize = 100_000;

/// A bound RDF term in a solution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SparqlTerm {
    Uri(String),
    Literal(String),
}

impl SparqlTerm {
    /// Lexical form without the term kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uri(s) | Self::Literal(s) => s,
        }
    }
}

/// Result of executing a SPARQL query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SparqlResult {
    Select {
        variables: Vec<String>,
        bindings: Vec<HashMap<String, SparqlTerm>>,
    },
    Construct {
        triples: Vec<Triple>,
    },
}

/// One term position in a triple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    Var(String),
    Uri(String),
    Literal(String),
}

/// A subject-predicate-object pattern
#[derive(Debug, Clone)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A FILTER constraint over one variable
#[derive(Debug, Clone)]
pub enum FilterExpr {
    Compare {
        var: String,
        op: CompareOp,
        value: String,
    },
    Regex {
        var: String,
        pattern: String,
    },
}

/// Query form: projection or template instantiation
#[derive(Debug, Clone)]
pub enum QueryForm {
    Select {
        variables: Vec<String>,
        distinct: bool,
    },
    Construct {
        template: Vec<TriplePattern>,
    },
}

/// A parsed SPARQL query
#[derive(Debug, Clone)]
pub struct SparqlQuery {
    pub form: QueryForm,
    pub patterns: Vec<TriplePattern>,
    pub graph_uri: Option<String>,
    pub filters: Vec<FilterExpr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Keyword(String),
    Var(String),
    Uri(String),
    Literal(String),
    PrefixedName(String, String),
    Number(String),
    Punct(char),
    Op(String),
}

/// Tokenize a query string
///
/// `<` is ambiguous between URIs and comparisons: followed by whitespace, a
/// digit, or `=` it reads as an operator, otherwise it opens a URI.
fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '<' => {
                chars.next();
                let next = chars.peek().copied();
                if next.is_none_or(|n| n.is_whitespace() || n.is_ascii_digit() || n == '=') {
                    let mut op = "<".to_string();
                    if next == Some('=') {
                        op.push('=');
                        chars.next();
                    }
                    tokens.push(Token::Op(op));
                    continue;
                }
                let mut uri = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some(c) => uri.push(c),
                        None => {
                            return Err(GraphError::SparqlParse(
                                "unterminated URI".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Uri(uri));
            }
            '=' | '!' | '>' => {
                chars.next();
                let mut op = c.to_string();
                if chars.peek() == Some(&'=') {
                    op.push('=');
                    chars.next();
                }
                if op == "!" {
                    return Err(GraphError::SparqlParse(
                        "unexpected '!' outside a comparison".to_string(),
                    ));
                }
                tokens.push(Token::Op(op));
            }
            '"' => {
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => {
                            if let Some(escaped) = chars.next() {
                                literal.push(escaped);
                            }
                        }
                        Some(c) => literal.push(c),
                        None => {
                            return Err(GraphError::SparqlParse(
                                "unterminated string literal".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Literal(literal));
            }
            '?' | '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(GraphError::SparqlParse("empty variable name".to_string()));
                }
                tokens.push(Token::Var(name));
            }
            '{' | '}' | '.' | '(' | ')' | ',' | ';' | '*' => {
                chars.next();
                tokens.push(Token::Punct(c));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                number.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == '-' {
                        word.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek() == Some(&':') {
                    chars.next();
                    let mut local = String::new();
                    while let Some(&d) = chars.peek() {
                        if d.is_alphanumeric() || d == '_' || d == '-' || d == '.' {
                            local.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::PrefixedName(word, local));
                } else {
                    tokens.push(Token::Keyword(word.to_uppercase()));
                }
            }
            _ => {
                return Err(GraphError::SparqlParse(format!(
                    "unexpected character '{c}'"
                )))
            }
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    prefixes: HashMap<String, String>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next() {
            Some(Token::Keyword(k)) if k == keyword => Ok(()),
            other => Err(GraphError::SparqlParse(format!(
                "expected {keyword}, found {other:?}"
            ))),
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<()> {
        match self.next() {
            Some(Token::Punct(p)) if p == punct => Ok(()),
            other => Err(GraphError::SparqlParse(format!(
                "expected '{punct}', found {other:?}"
            ))),
        }
    }

    fn resolve_prefixed(&self, prefix: &str, local: &str) -> Result<String> {
        self.prefixes
            .get(&prefix.to_lowercase())
            .map(|base| format!("{base}{local}"))
            .ok_or_else(|| GraphError::SparqlParse(format!("unknown prefix '{prefix}:'")))
    }

    fn parse_term(&mut self) -> Result<TermPattern> {
        match self.next() {
            Some(Token::Var(name)) => Ok(TermPattern::Var(name)),
            Some(Token::Uri(uri)) => Ok(TermPattern::Uri(ontology::normalize_uri(&uri))),
            Some(Token::Literal(text)) => Ok(TermPattern::Literal(text)),
            Some(Token::Number(n)) => Ok(TermPattern::Literal(n)),
            Some(Token::PrefixedName(prefix, local)) => {
                Ok(TermPattern::Uri(self.resolve_prefixed(&prefix, &local)?))
            }
            other => Err(GraphError::SparqlParse(format!(
                "expected term, found {other:?}"
            ))),
        }
    }

    fn parse_pattern_block(
        &mut self,
        patterns: &mut Vec<TriplePattern>,
        filters: &mut Vec<FilterExpr>,
        graph_uri: &mut Option<String>,
        allow_graph: bool,
    ) -> Result<()> {
        self.expect_punct('{')?;
        loop {
            match self.peek() {
                Some(Token::Punct('}')) => {
                    self.next();
                    return Ok(());
                }
                Some(Token::Punct('.')) => {
                    self.next();
                }
                Some(Token::Keyword(k)) if k == "FILTER" => {
                    self.next();
                    filters.push(self.parse_filter()?);
                }
                Some(Token::Keyword(k)) if k == "GRAPH" && allow_graph => {
                    self.next();
                    let uri = match self.next() {
                        Some(Token::Uri(uri)) => ontology::normalize_uri(&uri),
                        Some(Token::PrefixedName(prefix, local)) => {
                            self.resolve_prefixed(&prefix, &local)?
                        }
                        other => {
                            return Err(GraphError::SparqlParse(format!(
                                "expected graph URI, found {other:?}"
                            )))
                        }
                    };
                    *graph_uri = Some(uri);
                    let mut nested_graph = None;
                    self.parse_pattern_block(patterns, filters, &mut nested_graph, false)?;
                }
                Some(_) => {
                    let subject = self.parse_term()?;
                    let predicate = self.parse_term()?;
                    let object = self.parse_term()?;
                    patterns.push(TriplePattern {
                        subject,
                        predicate,
                        object,
                    });
                }
                None => {
                    return Err(GraphError::SparqlParse(
                        "unterminated pattern block".to_string(),
                    ))
                }
            }
        }
    }

    fn parse_filter(&mut self) -> Result<FilterExpr> {
        // `FILTER regex(?v, "p")` carries no outer parentheses;
        // `FILTER (?v < 3)` and `FILTER (regex(?v, "p"))` do.
        let outer_parens = if self.peek() == Some(&Token::Punct('(')) {
            self.next();
            true
        } else {
            false
        };

        let filter = match self.next() {
            Some(Token::Keyword(k)) if k == "REGEX" => {
                self.expect_punct('(')?;
                let var = match self.next() {
                    Some(Token::Var(name)) => name,
                    other => {
                        return Err(GraphError::SparqlParse(format!(
                            "regex expects a variable, found {other:?}"
                        )))
                    }
                };
                self.expect_punct(',')?;
                let pattern = match self.next() {
                    Some(Token::Literal(p)) => p,
                    other => {
                        return Err(GraphError::SparqlParse(format!(
                            "regex expects a string pattern, found {other:?}"
                        )))
                    }
                };
                self.expect_punct(')')?;
                FilterExpr::Regex { var, pattern }
            }
            Some(Token::Var(var)) => {
                let op = match self.next() {
                    Some(Token::Op(op)) => match op.as_str() {
                        "=" => CompareOp::Eq,
                        "!=" => CompareOp::Ne,
                        "<" => CompareOp::Lt,
                        "<=" => CompareOp::Le,
                        ">" => CompareOp::Gt,
                        ">=" => CompareOp::Ge,
                        other => {
                            return Err(GraphError::SparqlParse(format!(
                                "unsupported operator '{other}'"
                            )))
                        }
                    },
                    other => {
                        return Err(GraphError::SparqlParse(format!(
                            "expected comparison operator, found {other:?}"
                        )))
                    }
                };
                let value = match self.next() {
                    Some(Token::Literal(v) | Token::Number(v)) => v,
                    Some(Token::Uri(v)) => ontology::normalize_uri(&v),
                    other => {
                        return Err(GraphError::SparqlParse(format!(
                            "expected filter value, found {other:?}"
                        )))
                    }
                };
                FilterExpr::Compare { var, op, value }
            }
            other => {
                return Err(GraphError::SparqlParse(format!(
                    "unsupported filter expression: {other:?}"
                )))
            }
        };
        if outer_parens {
            self.expect_punct(')')?;
        }
        Ok(filter)
    }

    fn parse_modifiers(&mut self) -> Result<(Option<usize>, Option<usize>)> {
        let mut limit = None;
        let mut offset = None;
        while let Some(Token::Keyword(k)) = self.peek() {
            let keyword = k.clone();
            match keyword.as_str() {
                "LIMIT" => {
                    self.next();
                    limit = Some(self.parse_usize()?);
                }
                "OFFSET" => {
                    self.next();
                    offset = Some(self.parse_usize()?);
                }
                _ => {
                    return Err(GraphError::SparqlParse(format!(
                        "unexpected keyword '{keyword}'"
                    )))
                }
            }
        }
        Ok((limit, offset))
    }

    fn parse_usize(&mut self) -> Result<usize> {
        match self.next() {
            Some(Token::Number(n)) => n
                .parse()
                .map_err(|_| GraphError::SparqlParse(format!("invalid count '{n}'"))),
            other => Err(GraphError::SparqlParse(format!(
                "expected number, found {other:?}"
            ))),
        }
    }
}

/// Parse a SPARQL SELECT or CONSTRUCT query
///
/// # Errors
///
/// Returns `SparqlParse` on any syntax the subset does not accept.
pub fn parse(input: &str) -> Result<SparqlQuery> {
    if input.trim().is_empty() {
        return Err(GraphError::invalid_argument("query must not be empty"));
    }
    let tokens = lex(input)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        prefixes: HashMap::new(),
    };

    // PREFIX declarations
    while matches!(parser.peek(), Some(Token::Keyword(k)) if k == "PREFIX") {
        parser.next();
        let (prefix, local) = match parser.next() {
            Some(Token::PrefixedName(prefix, local)) => (prefix, local),
            other => {
                return Err(GraphError::SparqlParse(format!(
                    "expected prefix name, found {other:?}"
                )))
            }
        };
        if !local.is_empty() {
            return Err(GraphError::SparqlParse(format!(
                "malformed prefix declaration '{prefix}:{local}'"
            )));
        }
        let base = match parser.next() {
            Some(Token::Uri(uri)) => uri,
            other => {
                return Err(GraphError::SparqlParse(format!(
                    "expected prefix URI, found {other:?}"
                )))
            }
        };
        parser.prefixes.insert(prefix.to_lowercase(), base);
    }

    let mut patterns = Vec::new();
    let mut filters = Vec::new();
    let mut graph_uri = None;

    let form = match parser.next() {
        Some(Token::Keyword(k)) if k == "SELECT" => {
            let distinct =
                if matches!(parser.peek(), Some(Token::Keyword(k)) if k == "DISTINCT") {
                    parser.next();
                    true
                } else {
                    false
                };
            let mut variables = Vec::new();
            loop {
                match parser.peek() {
                    Some(Token::Var(_)) => {
                        if let Some(Token::Var(name)) = parser.next() {
                            variables.push(name);
                        }
                    }
                    Some(Token::Punct('*')) => {
                        parser.next();
                    }
                    _ => break,
                }
            }
            parser.expect_keyword("WHERE")?;
            parser.parse_pattern_block(&mut patterns, &mut filters, &mut graph_uri, true)?;
            QueryForm::Select {
                variables,
                distinct,
            }
        }
        Some(Token::Keyword(k)) if k == "CONSTRUCT" => {
            let mut template = Vec::new();
            let mut template_filters = Vec::new();
            let mut template_graph = None;
            parser.parse_pattern_block(
                &mut template,
                &mut template_filters,
                &mut template_graph,
                false,
            )?;
            if !template_filters.is_empty() {
                return Err(GraphError::SparqlParse(
                    "FILTER is not allowed in a CONSTRUCT template".to_string(),
                ));
            }
            parser.expect_keyword("WHERE")?;
            parser.parse_pattern_block(&mut patterns, &mut filters, &mut graph_uri, true)?;
            QueryForm::Construct { template }
        }
        other => {
            return Err(GraphError::SparqlParse(format!(
                "expected SELECT or CONSTRUCT, found {other:?}"
            )))
        }
    };

    let (limit, offset) = parser.parse_modifiers()?;
    if parser.peek().is_some() {
        return Err(GraphError::SparqlParse(format!(
            "trailing tokens at position {}",
            parser.position
        )));
    }

    Ok(SparqlQuery {
        form,
        patterns,
        graph_uri,
        filters,
        limit,
        offset,
    })
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

fn term_matches(
    pattern: &TermPattern,
    value: &SparqlTerm,
    binding: &HashMap<String, SparqlTerm>,
) -> Option<Option<(String, SparqlTerm)>> {
    match pattern {
        TermPattern::Var(name) => binding.get(name).map_or_else(
            || Some(Some((name.clone(), value.clone()))),
            |bound| (bound == value).then_some(None),
        ),
        TermPattern::Uri(uri) => {
            (matches!(value, SparqlTerm::Uri(v) if v == uri)).then_some(None)
        }
        TermPattern::Literal(text) => {
            (matches!(value, SparqlTerm::Literal(v) if v == text)).then_some(None)
        }
    }
}

fn triple_terms(triple: &Triple) -> (SparqlTerm, SparqlTerm, SparqlTerm) {
    let object = if triple.is_literal {
        SparqlTerm::Literal(triple.object_id.clone())
    } else {
        SparqlTerm::Uri(triple.object_id.clone())
    };
    (
        SparqlTerm::Uri(triple.subject_id.clone()),
        SparqlTerm::Uri(triple.predicate_uri.clone()),
        object,
    )
}

fn passes_filter(filter: &FilterExpr, binding: &HashMap<String, SparqlTerm>) -> Result<bool> {
    match filter {
        FilterExpr::Compare { var, op, value } => {
            let Some(bound) = binding.get(var) else {
                return Ok(false);
            };
            let lhs = bound.as_str();
            let ordering = match (lhs.parse::<f64>(), value.parse::<f64>()) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b),
                _ => Some(lhs.cmp(value.as_str())),
            };
            let Some(ordering) = ordering else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Eq => ordering.is_eq(),
                CompareOp::Ne => !ordering.is_eq(),
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::Ge => ordering.is_ge(),
            })
        }
        FilterExpr::Regex { var, pattern } => {
            let Some(bound) = binding.get(var) else {
                return Ok(false);
            };
            let re = regex::Regex::new(pattern)
                .map_err(|e| GraphError::SparqlParse(format!("invalid regex: {e}")))?;
            Ok(re.is_match(bound.as_str()))
        }
    }
}

/// Execute a parsed query against the tenant's dataset
///
/// # Errors
///
/// Returns `Query` when intermediate solutions exceed the binding cap and
/// `SparqlParse` for invalid filter regexes.
pub fn execute(query: &SparqlQuery, dataset: &[Triple], tenant_id: &str) -> Result<SparqlResult> {
    let scoped: Vec<&Triple> = query.graph_uri.as_ref().map_or_else(
        || dataset.iter().collect(),
        |graph| dataset.iter().filter(|t| &t.graph_uri == graph).collect(),
    );

    let mut bindings: Vec<HashMap<String, SparqlTerm>> = vec![HashMap::new()];
    for pattern in &query.patterns {
        let mut extended = Vec::new();
        for binding in &bindings {
            for triple in &scoped {
                let (subject, predicate, object) = triple_terms(triple);
                let Some(s_bind) = term_matches(&pattern.subject, &subject, binding) else {
                    continue;
                };
                let mut candidate = binding.clone();
                if let Some((name, value)) = s_bind {
                    candidate.insert(name, value);
                }
                let Some(p_bind) = term_matches(&pattern.predicate, &predicate, &candidate)
                else {
                    continue;
                };
                if let Some((name, value)) = p_bind {
                    candidate.insert(name, value);
                }
                let Some(o_bind) = term_matches(&pattern.object, &object, &candidate) else {
                    continue;
                };
                if let Some((name, value)) = o_bind {
                    candidate.insert(name, value);
                }
                extended.push(candidate);
                if extended.len() > MAX_BINDINGS {
                    return Err(GraphError::Query(format!(
                        "query exceeded {MAX_BINDINGS} intermediate solutions"
                    )));
                }
            }
        }
        bindings = extended;
        if bindings.is_empty() {
            break;
        }
    }

    for filter in &query.filters {
        let mut kept = Vec::new();
        for binding in bindings {
            if passes_filter(filter, &binding)? {
                kept.push(binding);
            }
        }
        bindings = kept;
    }
    debug!(solutions = bindings.len(), "SPARQL pattern matching complete");

    match &query.form {
        QueryForm::Select {
            variables,
            distinct,
        } => {
            let projected_vars: Vec<String> = if variables.is_empty() {
                let mut all: Vec<String> = bindings
                    .iter()
                    .flat_map(|b| b.keys().cloned())
                    .collect::<std::collections::HashSet<_>>()
                    .into_iter()
                    .collect();
                all.sort();
                all
            } else {
                variables.clone()
            };

            let mut rows: Vec<HashMap<String, SparqlTerm>> = bindings
                .into_iter()
                .map(|binding| {
                    projected_vars
                        .iter()
                        .filter_map(|v| binding.get(v).map(|t| (v.clone(), t.clone())))
                        .collect()
                })
                .collect();

            if *distinct {
                let mut seen = std::collections::HashSet::new();
                rows.retain(|row| {
                    let mut fingerprint: Vec<(String, SparqlTerm)> =
                        row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    fingerprint.sort_by(|a, b| a.0.cmp(&b.0));
                    seen.insert(fingerprint)
                });
            }

            let rows: Vec<HashMap<String, SparqlTerm>> = rows
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect();

            Ok(SparqlResult::Select {
                variables: projected_vars,
                bindings: rows,
            })
        }
        QueryForm::Construct { template } => {
            let mut triples = Vec::new();
            for binding in bindings
                .iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
            {
                for pattern in template {
                    if let Some(triple) = instantiate(pattern, binding, tenant_id) {
                        triples.push(triple);
                    }
                }
            }
            Ok(SparqlResult::Construct { triples })
        }
    }
}

/// Instantiate one template pattern; unbound variables drop the statement
fn instantiate(
    pattern: &TriplePattern,
    binding: &HashMap<String, SparqlTerm>,
    tenant_id: &str,
) -> Option<Triple> {
    let resolve = |term: &TermPattern| -> Option<SparqlTerm> {
        match term {
            TermPattern::Var(name) => binding.get(name).cloned(),
            TermPattern::Uri(uri) => Some(SparqlTerm::Uri(uri.clone())),
            TermPattern::Literal(text) => Some(SparqlTerm::Literal(text.clone())),
        }
    };

    let subject = resolve(&pattern.subject)?;
    let predicate = resolve(&pattern.predicate)?;
    let object = resolve(&pattern.object)?;

    let mut triple = Triple::new(
        tenant_id,
        subject.as_str(),
        predicate.as_str(),
        object.as_str(),
        ontology::default_graph_uri(tenant_id),
    );
    if matches!(object, SparqlTerm::Literal(_)) {
        triple = triple.as_literal(None);
    }
    Some(triple)
}
