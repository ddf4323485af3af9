//! Formula syntax.
//!
//! A formula body is read in two layers. Function calls come first: they are
//! found left to right, their argument lists split on top-level `;` and each
//! argument classified as a range, a bare reference or a nested formula. The
//! evaluator reduces every call to a number and writes that number back in
//! place of the call. The arithmetic text that remains is tokenized and
//! converted to postfix order with the shunting-yard algorithm:
//!
//! ```text
//! Formula    ::= ( Text | Call )*
//! Call       ::= Name "(" Argument? ( ";" Argument? )* ")"
//! Argument   ::= CellRef ":" CellRef | CellRef | Formula
//! Arithmetic ::= Operand ( Operator Operand )*      (with parentheses)
//! ```
//!
//! Call discovery is lazy so that a call is evaluated before anything to its
//! right is examined. Evaluation itself lives in [`super::services`].

use super::address::is_reference_syntax;
use super::errors::{DomainError, DomainResult};
use super::functions::Function;
use super::lexer::{tokenize, Operator, Token};

/// One element of a postfix sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Number(String),
    Cell(String),
    Operator(Operator),
}

/// A parsed arithmetic expression in postfix (RPN) order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expr {
    pub postfix: Vec<Term>,
}

/// A piece of a formula body.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Text between calls, copied through unchanged.
    Text(&'a str),
    Call(FunctionCall<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall<'a> {
    pub function: Function,
    pub args: Vec<Argument<'a>>,
}

/// A function argument, classified the way the aggregate sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument<'a> {
    /// `REF:REF`, corners as written.
    Range(&'a str, &'a str),
    /// A bare reference; subject to the function's missing-value policy.
    Cell(&'a str),
    /// Anything else, evaluated as a formula of its own.
    Expression(&'a str),
}

/// Splits a whitespace-free formula body into text and function calls.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::{segments, Argument, Function, Segment};
///
/// let parts: Vec<Segment> = segments("2*MAX(A1:B2;3)").collect::<Result<_, _>>().unwrap();
/// assert_eq!(parts[0], Segment::Text("2*"));
/// let Segment::Call(call) = &parts[1] else { panic!() };
/// assert_eq!(call.function, Function::Max);
/// assert_eq!(call.args, vec![Argument::Range("A1", "B2"), Argument::Expression("3")]);
/// ```
pub fn segments(body: &str) -> Segments<'_> {
    Segments { body, pos: 0 }
}

/// Iterator returned by [`segments`]. Stops after the first error.
pub struct Segments<'a> {
    body: &'a str,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = DomainResult<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let body = self.body;
        let rest = &body[self.pos..];
        if rest.is_empty() {
            return None;
        }

        let Some(site) = find_call(rest) else {
            self.pos = body.len();
            return Some(Ok(Segment::Text(rest)));
        };

        if site.start > 0 {
            self.pos += site.start;
            return Some(Ok(Segment::Text(&rest[..site.start])));
        }

        match parse_call(rest, &site) {
            Ok((call, end)) => {
                self.pos += end;
                Some(Ok(Segment::Call(call)))
            }
            Err(err) => {
                self.pos = body.len();
                Some(Err(err))
            }
        }
    }
}

/// Where a call starts: the function name at `start`, its `(` at `open`.
struct CallSite {
    start: usize,
    open: usize,
    function: Function,
}

/// Finds the first run of letters that names a function and is directly
/// followed by `(`.
fn find_call(text: &str) -> Option<CallSite> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_alphabetic() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if bytes.get(i) == Some(&b'(') {
            if let Some(function) = Function::lookup(&text[start..i]) {
                return Some(CallSite { start, open: i, function });
            }
        }
    }

    None
}

/// Parses the call at the start of `text`, returning it with the offset just
/// past its closing `)`.
fn parse_call<'a>(text: &'a str, site: &CallSite) -> DomainResult<(FunctionCall<'a>, usize)> {
    let close = matching_paren(text, site.open)
        .ok_or_else(|| DomainError::UnterminatedFunctionCall(site.function.to_string()))?;

    let args = split_arguments(&text[site.open + 1..close])
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .map(classify_argument)
        .collect();

    Ok((FunctionCall { function: site.function, args }, close + 1))
}

/// Finds the `)` closing the `(` at `open`, counting nesting depth.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in text.bytes().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits an argument list on `;` that are not nested inside parentheses.
fn split_arguments(inner: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, byte) in inner.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => {
                args.push(&inner[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    args.push(&inner[start..]);
    args
}

fn classify_argument(arg: &str) -> Argument<'_> {
    if let Some((start, end)) = arg.split_once(':') {
        if is_reference_syntax(start) && is_reference_syntax(end) {
            return Argument::Range(start, end);
        }
    }
    if is_reference_syntax(arg) {
        Argument::Cell(arg)
    } else {
        Argument::Expression(arg)
    }
}

/// Tokenizes call-free arithmetic text and converts it to postfix.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::{parse_arithmetic, Operator, Term};
///
/// let expr = parse_arithmetic("1+2*3").unwrap();
/// assert_eq!(expr.postfix, vec![
///     Term::Number("1".into()),
///     Term::Number("2".into()),
///     Term::Number("3".into()),
///     Term::Operator(Operator::Multiply),
///     Term::Operator(Operator::Add),
/// ]);
/// ```
pub fn parse_arithmetic(text: &str) -> DomainResult<Expr> {
    let tokens = tokenize(text)?;
    to_postfix(tokens).map(|postfix| Expr { postfix })
}

/// Shunting-yard conversion from infix to postfix.
///
/// Operators of equal or higher precedence are popped before a new one is
/// pushed, which makes every operator left-associative.
pub fn to_postfix(tokens: Vec<Token>) -> DomainResult<Vec<Term>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(text) => output.push(Term::Number(text)),
            Token::Cell(text) => output.push(Term::Cell(text)),
            Token::Operator(operator) => {
                while let Some(Token::Operator(top)) = stack.last() {
                    if top.precedence() < operator.precedence() {
                        break;
                    }
                    output.push(Term::Operator(*top));
                    stack.pop();
                }
                stack.push(Token::Operator(operator));
            }
            Token::LeftParen => stack.push(Token::LeftParen),
            Token::RightParen => loop {
                match stack.pop() {
                    Some(Token::Operator(operator)) => output.push(Term::Operator(operator)),
                    Some(Token::LeftParen) => break,
                    _ => return Err(DomainError::MismatchedParentheses),
                }
            },
        }
    }

    while let Some(token) = stack.pop() {
        match token {
            Token::Operator(operator) => output.push(Term::Operator(operator)),
            _ => return Err(DomainError::MismatchedParentheses),
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(text: &str) -> Term {
        Term::Number(text.to_string())
    }

    fn cell(text: &str) -> Term {
        Term::Cell(text.to_string())
    }

    fn op(operator: Operator) -> Term {
        Term::Operator(operator)
    }

    fn parts(body: &str) -> DomainResult<Vec<Segment<'_>>> {
        segments(body).collect()
    }

    #[test]
    fn test_precedence_and_left_associativity() {
        let expr = parse_arithmetic("8-3-1").unwrap();
        assert_eq!(
            expr.postfix,
            vec![num("8"), num("3"), op(Operator::Subtract), num("1"), op(Operator::Subtract)]
        );

        let expr = parse_arithmetic("A1+B1*C1").unwrap();
        assert_eq!(
            expr.postfix,
            vec![cell("A1"), cell("B1"), cell("C1"), op(Operator::Multiply), op(Operator::Add)]
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse_arithmetic("(1+2)*3").unwrap();
        assert_eq!(
            expr.postfix,
            vec![num("1"), num("2"), op(Operator::Add), num("3"), op(Operator::Multiply)]
        );
    }

    #[test]
    fn test_mismatched_parentheses() {
        assert_eq!(parse_arithmetic("(1+2"), Err(DomainError::MismatchedParentheses));
        assert_eq!(parse_arithmetic("1+2)"), Err(DomainError::MismatchedParentheses));
    }

    #[test]
    fn test_text_without_calls_is_one_segment() {
        assert_eq!(parts("A1+2*B3").unwrap(), vec![Segment::Text("A1+2*B3")]);
        assert!(parts("").unwrap().is_empty());
        // letters not followed by '(' or not a registered name stay text
        assert_eq!(parts("SUMA+IF(1)").unwrap(), vec![Segment::Text("SUMA+IF(1)")]);
    }

    #[test]
    fn test_function_arguments_are_classified() {
        let found = parts("SUMA(A1:B3;c4;2*3;;MAX(1;2))").unwrap();
        let [Segment::Call(call)] = found.as_slice() else {
            panic!("expected a single call, got {found:?}");
        };

        assert_eq!(call.function, Function::Sum);
        assert_eq!(
            call.args,
            vec![
                Argument::Range("A1", "B3"),
                Argument::Cell("c4"),
                Argument::Expression("2*3"),
                Argument::Expression("MAX(1;2)"),
            ]
        );
    }

    #[test]
    fn test_parenthesized_reference_is_an_expression() {
        let found = parts("MIN((A1))").unwrap();
        let [Segment::Call(call)] = found.as_slice() else {
            panic!("expected a call");
        };
        assert_eq!(call.args, vec![Argument::Expression("(A1)")]);
    }

    #[test]
    fn test_malformed_range_is_an_expression() {
        let found = parts("SUMA(A1:B2+1)").unwrap();
        let [Segment::Call(call)] = found.as_slice() else {
            panic!("expected a call");
        };
        assert_eq!(call.args, vec![Argument::Expression("A1:B2+1")]);
    }

    #[test]
    fn test_calls_between_text() {
        let found = parts("MAX(1;2;3)*10+min(8;4)").unwrap();
        assert_eq!(found.len(), 3);
        assert!(matches!(&found[0], Segment::Call(FunctionCall { function: Function::Max, .. })));
        assert_eq!(found[1], Segment::Text("*10+"));
        assert!(matches!(&found[2], Segment::Call(FunctionCall { function: Function::Min, .. })));
    }

    #[test]
    fn test_unterminated_call() {
        assert_eq!(
            parts("SUMA(1;2"),
            Err(DomainError::UnterminatedFunctionCall("SUMA".to_string()))
        );
        assert_eq!(
            parts("MAX((1;2)"),
            Err(DomainError::UnterminatedFunctionCall("MAX".to_string()))
        );
    }

    #[test]
    fn test_segments_are_produced_lazily() {
        let mut iter = segments("MIN(1)+%+SUMA(2");
        assert!(matches!(iter.next(), Some(Ok(Segment::Call(_)))));
        assert_eq!(iter.next(), Some(Ok(Segment::Text("+%+"))));
        assert_eq!(
            iter.next(),
            Some(Err(DomainError::UnterminatedFunctionCall("SUMA".to_string())))
        );
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_empty_input_parses_to_empty_postfix() {
        assert_eq!(parse_arithmetic("").unwrap(), Expr::default());
        assert_eq!(parse_arithmetic("()").unwrap(), Expr::default());
    }
}
