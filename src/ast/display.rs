//! Rendering of AST nodes back into AIQL surface syntax

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter, Write};

use super::*;

fn write_joined<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn write_pairs(f: &mut Formatter<'_>, pairs: &BTreeMap<String, String>) -> fmt::Result {
    f.write_char('(')?;
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: ", key)?;
        write_quoted(f, value)?;
    }
    f.write_char(')')
}

fn is_plain_word(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write_quoted(f, s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl Display for Spatial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Spatial::Point { lat, lon } => write!(f, "geo({}, {})", lat, lon),
            Spatial::Variable(name) => write!(f, "geo({})", name),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Concept(name) => write!(f, "<{}>", name),
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Identifier(name) => f.write_str(name),
            Expression::Math { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Set { op, left, right } => {
                write!(f, "({} {} {})", left, op.keyword(), right)
            }
            Expression::FunctionApplication { name, args } if name == LIST_FUNCTION => {
                f.write_char('[')?;
                write_joined(f, args, ", ")?;
                f.write_char(']')
            }
            Expression::FunctionApplication { name, args } => {
                write!(f, "{}(", name)?;
                write_joined(f, args, ", ")?;
                f.write_char(')')
            }
            Expression::Lambda { params, body } => {
                write!(f, "lambda({}) -> {}", params.join(", "), body)
            }
            Expression::Unary { op: UnaryOp::Neg, operand } => write!(f, "-{}", operand),
            Expression::Unary { op: UnaryOp::Not, operand } => write!(f, "not {}", operand),
            Expression::Comparison { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Spatial(spatial) => write!(f, "{}", spatial),
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label())
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Literal(lit) => write!(f, "{}", lit),
            AttributeValue::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.object)?;
        if !self.attributes.is_empty() {
            f.write_str(" {")?;
            for (i, (key, value)) in self.attributes.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            f.write_char('}')?;
        }
        Ok(())
    }
}

impl Intent {
    fn fmt_metadata(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(c) = self.confidence {
            write!(f, " @{}", c)?;
        }
        if let Some(c) = self.coherence {
            write!(f, " @coherence: {}", c)?;
        }
        if let Some(t) = self.temperature {
            write!(f, " ~{}", t)?;
        }
        if let Some(e) = self.entropy {
            write!(f, " ~~{}", e)?;
        }
        if let Some(id) = &self.id {
            write!(f, " ${}", id)?;
        }
        if let Some(group) = &self.group_id {
            write!(f, " $${}", group)?;
        }
        if let Some(seq) = self.sequence {
            write!(f, " ##{}", seq)?;
        }
        if let Some(security) = &self.security {
            f.write_str(" #security")?;
            write_pairs(f, security)?;
        }
        Ok(())
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // A single asserted statement reads back as a bare fact
        if self.intent_type == ASSERT_INTENT
            && self.statements.len() == 1
            && self.context.is_empty()
        {
            write!(f, "{}", self.statements[0])?;
            return self.fmt_metadata(f);
        }

        write!(f, "!{}", self.intent_type)?;
        if !self.context.is_empty() {
            write_pairs(f, &self.context)?;
        }
        f.write_str(" {")?;
        for (i, statement) in self.statements.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { "; " })?;
            write!(f, "{}", statement)?;
        }
        f.write_str(" }")?;
        self.fmt_metadata(f)
    }
}

impl Display for LogicalExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogicalExpression::Not(child) => write!(f, "not {}", child),
            LogicalExpression::Binary {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator.keyword(), right),
        }
    }
}

impl Display for QuantifiedExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({} {}", self.quantifier.keyword(), self.variable)?;
        if let Some(domain) = &self.domain {
            if domain.starts_with('<') || is_plain_word(domain) {
                write!(f, " in {}", domain)?;
            } else {
                f.write_str(" in ")?;
                write_quoted(f, domain)?;
            }
        }
        write!(f, ": {})", self.body)
    }
}

impl Display for RuleDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "rule {}", self.name)?;
        if self.bidirectional {
            f.write_str(" bidirectional")?;
        }
        write!(f, " {{ {} }} => {{ {} }}", self.premises, self.conclusion)?;
        if self.confidence.value() != 1.0 {
            write!(f, " @{}", self.confidence)?;
        }
        Ok(())
    }
}

impl Display for RelationshipNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relationship ${} {} ${}",
            self.source, self.relation, self.target
        )?;
        if let Some(c) = self.confidence {
            write!(f, " @{}", c)?;
        }
        Ok(())
    }
}

impl Display for ExampleNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(if self.pattern {
            "#example_pattern: "
        } else {
            "#example: "
        })?;
        write_quoted(f, &self.name)?;
        f.write_str(" {")?;
        for node in &self.body {
            write!(f, " {}", node)?;
        }
        f.write_str(" }")
    }
}

impl Display for LogicalNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogicalNode::Intent(n) => write!(f, "{}", n),
            LogicalNode::Logical(n) => write!(f, "{}", n),
            LogicalNode::Quantified(n) => write!(f, "{}", n),
            LogicalNode::Rule(n) => write!(f, "{}", n),
            LogicalNode::Relationship(n) => write!(f, "{}", n),
            LogicalNode::Example(n) => write!(f, "{}", n),
        }
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.name)?;
        if !self.params.is_empty() {
            write_pairs(f, &self.params)?;
        }
        Ok(())
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let provenance = [
            ("@version", &self.version),
            ("@origin", &self.origin),
            ("@citation", &self.citation),
        ];
        for (marker, value) in provenance {
            if let Some(value) = value {
                write!(f, "{}: ", marker)?;
                write_quoted(f, value)?;
                f.write_char('\n')?;
            }
        }
        for directive in &self.directives {
            writeln!(f, "{}", directive)?;
        }
        for node in &self.body {
            writeln!(f, "{}", node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_rendering() {
        let mut stmt = Statement::triple("Python", "is_a", "Language");
        stmt.relation.tense = Some(Tense::Past);
        stmt.attributes
            .insert("since".to_string(), AttributeValue::from(Expression::number(1991.0)));
        assert_eq!(stmt.to_string(), "<Python> [is_a:past] <Language> {since: 1991}");
    }

    #[test]
    fn test_intent_rendering() {
        let fact = LogicalNode::fact(Statement::triple("A", "p", "B"));
        assert_eq!(fact.to_string(), "<A> [p] <B>");

        let mut intent = Intent::new("query", vec![Statement::triple("A", "p", "B")]);
        intent.confidence = Some(Number::new(0.9));
        intent.context.insert("limit".to_string(), "5".to_string());
        assert_eq!(
            LogicalNode::from(intent).to_string(),
            "!query(limit: \"5\") { <A> [p] <B> } @0.9"
        );
    }

    #[test]
    fn test_logical_rendering() {
        let a = LogicalNode::fact(Statement::triple("A", "p", "B"));
        let b = LogicalNode::fact(Statement::triple("C", "q", "D"));
        assert_eq!(
            LogicalNode::implies(a.clone(), LogicalNode::not(b)).to_string(),
            "(<A> [p] <B> implies not <C> [q] <D>)"
        );
    }

    #[test]
    fn test_expression_rendering() {
        let expr = Expression::math(
            MathOp::Sub,
            Expression::math(MathOp::Sub, Expression::number(10.0), Expression::number(5.0)),
            Expression::number(2.0),
        );
        assert_eq!(expr.to_string(), "((10 - 5) - 2)");
        assert_eq!(
            Expression::list(vec![Expression::string("a\"b"), Expression::boolean(true)])
                .to_string(),
            "[\"a\\\"b\", true]"
        );
    }
}
