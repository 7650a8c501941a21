//! Modular (list/statement) productions: [`Delimited`] and [`Terminated`].
//!
//! These generics replace the sentinel-terminated match lists of the
//! source's parser utilities (`SPEC_FULL.md` §9) and give the tail-recursive
//! non-terminals (`sequence`, `module-seq`, `argument-list`, `list`, `dict`,
//! `parameter-list`, ...) an iterative realization instead of growing the
//! call stack on every element.
//!
//! #### Delimited BNF
//! ```text
//! <A>  -> e<A'>
//!       | ε
//! <A'> -> de<A'>
//!       | ε
//! ```
//!
//! #### Terminated BNF
//! ```text
//! <A>  -> ed<A>
//!       | ε
//! ```
//!
//! Where `e` and `d` are each the `Expected` item in the list and the
//! `Delimiter` of the list.

use std::io::Write;
use std::slice::Iter;

use crate::{make_indent, Parse, ParseDisplay};

/// A list of items, each delimited by a delimiter, with no trailing
/// delimiter (e.g. `param-list`, `arg-list`).
#[derive(Clone)]
pub struct Delimited<Expected: Parse, Delimiter: Parse> {
    items: Vec<(Expected, Option<Delimiter>)>,
}

impl<E: Parse, D: Parse> Delimited<E, D> {
    pub fn items(&self) -> &Vec<(E, Option<D>)> {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'d, E: Parse, D: Parse> IntoIterator for &'d Delimited<E, D> {
    type Item = &'d (E, Option<D>);
    type IntoIter = Iter<'d, (E, Option<D>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<E: Parse, D: Parse> From<Vec<(E, Option<D>)>> for Delimited<E, D> {
    fn from(items: Vec<(E, Option<D>)>) -> Self {
        Delimited { items }
    }
}

impl<E: Parse, D: Parse> Parse for Delimited<E, D> {
    fn parse(buffer: &mut crate::ParseBuffer<'_>) -> Result<Self, String> {
        let mut items = vec![];
        let mut fork = buffer.fork();

        let e = match E::parse(&mut fork) {
            Ok(e) => e,
            Err(_) => return Ok(items.into()),
        };
        match D::parse(&mut fork) {
            Ok(d) => items.push((e, Some(d))),
            Err(_) => {
                items.push((e, None));
                *buffer = fork;
                return Ok(items.into());
            }
        }

        loop {
            let e = match E::parse(&mut fork) {
                Ok(e) => e,
                Err(err) => {
                    let mut err_msg = Vec::new();
                    writeln!(&mut err_msg, "While parsing {}...", Self::parse_label()).unwrap();
                    write!(&mut err_msg, "    {err}").unwrap();
                    return Err(String::from_utf8(err_msg).unwrap());
                }
            };

            match D::parse(&mut fork) {
                Ok(d) => items.push((e, Some(d))),
                Err(_) => {
                    items.push((e, None));
                    *buffer = fork;
                    return Ok(items.into());
                }
            }
        }
    }

    fn parse_label() -> String {
        format!(
            "Delimited Sequence of `{}` by `{}`",
            E::parse_label(),
            D::parse_label()
        )
    }
}

impl<E, D> ParseDisplay for Delimited<E, D>
where
    E: Parse + ParseDisplay,
    D: Parse,
{
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        let lexemes_label = self.lexeme_signature();
        println!("{indent}{label}: {lexemes_label}");

        for (e, _d) in self {
            e.display(depth + 1, None);
        }
    }

    fn lexeme_signature(&self) -> String {
        let mut sigg = String::new();
        let mut iter = self.items.iter().peekable();

        if iter.peek().is_none() {
            return sigg;
        }

        loop {
            let (e, maybe_d) = iter.next().unwrap();
            sigg.extend(e.lexeme_signature().chars());

            if let Some(d) = maybe_d {
                assert!(iter.peek().is_some());
                sigg.extend(d.lexeme_signature().chars());
                sigg.push(' ');
            } else {
                assert!(iter.peek().is_none());
                break;
            }
        }

        sigg
    }
}

/// A list of items, each terminated by a delimiter (e.g. `sequence`,
/// `module-seq`).
#[derive(Clone)]
pub struct Terminated<Expected: Parse, Delimiter: Parse> {
    items: Vec<(Expected, Delimiter)>,
}

impl<E: Parse, D: Parse> Terminated<E, D> {
    pub fn items(&self) -> &Vec<(E, D)> {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'t, E: Parse, D: Parse> IntoIterator for &'t Terminated<E, D> {
    type Item = &'t (E, D);
    type IntoIter = Iter<'t, (E, D)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<E: Parse, D: Parse> From<Vec<(E, D)>> for Terminated<E, D> {
    fn from(items: Vec<(E, D)>) -> Self {
        Terminated { items }
    }
}

impl<E: Parse, D: Parse> Parse for Terminated<E, D> {
    fn parse(buffer: &mut crate::ParseBuffer<'_>) -> Result<Self, String> {
        let mut items = vec![];
        let mut fork = buffer.fork();

        let e = match E::parse(&mut fork) {
            Ok(e) => e,
            Err(_) => return Ok(items.into()),
        };
        match D::parse(&mut fork) {
            Ok(d) => items.push((e, d)),
            Err(err) => {
                let mut err_msg = Vec::new();
                writeln!(&mut err_msg, "While parsing {}...", Self::parse_label()).unwrap();
                write!(&mut err_msg, "    {err}").unwrap();
                return Err(String::from_utf8(err_msg).unwrap());
            }
        }

        loop {
            let e = match E::parse(&mut fork) {
                Ok(e) => e,
                Err(_) => {
                    *buffer = fork;
                    return Ok(items.into());
                }
            };
            match D::parse(&mut fork) {
                Ok(d) => items.push((e, d)),
                Err(err) => {
                    let mut err_msg = Vec::new();
                    writeln!(&mut err_msg, "While parsing {}...", Self::parse_label()).unwrap();
                    write!(&mut err_msg, "    {err}").unwrap();
                    return Err(String::from_utf8(err_msg).unwrap());
                }
            }
        }
    }

    fn parse_label() -> String {
        format!(
            "Terminated Sequence of `{}` by `{}`",
            E::parse_label(),
            D::parse_label()
        )
    }
}

impl<E, D> ParseDisplay for Terminated<E, D>
where
    E: Parse + ParseDisplay,
    D: Parse + ParseDisplay,
{
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        let lexemes_label = self.lexeme_signature();
        println!("{indent}{label}: {lexemes_label}");

        for (e, _d) in self {
            e.display(depth + 1, None);
        }
    }

    fn lexeme_signature(&self) -> String {
        let mut sigg = String::new();
        let mut iter = self.into_iter().peekable();
        while let Some((e, d)) = iter.next() {
            sigg.extend(e.lexeme_signature().chars());
            sigg.extend(d.lexeme_signature().chars());
            if iter.peek().is_some() {
                sigg.push(' ');
            }
        }
        sigg
    }
}

/// A self-terminated repetition with no separate delimiter token
/// (`sequence`, `module-seq`): each element already consumes its own
/// trailing punctuation, so the list just stops at the first element that
/// fails to parse.
#[derive(Clone)]
pub struct Repeated<Item: Parse> {
    items: Vec<Item>,
}

impl<T: Parse> Repeated<T> {
    pub fn items(&self) -> &Vec<T> {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'r, T: Parse> IntoIterator for &'r Repeated<T> {
    type Item = &'r T;
    type IntoIter = Iter<'r, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Parse> From<Vec<T>> for Repeated<T> {
    fn from(items: Vec<T>) -> Self {
        Repeated { items }
    }
}

impl<T: Parse> Parse for Repeated<T> {
    fn parse(buffer: &mut crate::ParseBuffer<'_>) -> Result<Self, String> {
        let mut items = vec![];
        loop {
            let mut fork = buffer.fork();
            match T::parse(&mut fork) {
                Ok(item) => {
                    items.push(item);
                    *buffer = fork;
                }
                Err(_) => return Ok(items.into()),
            }
        }
    }

    fn parse_label() -> String {
        format!("Repeated `{}`", T::parse_label())
    }
}

impl<T: Parse + ParseDisplay> ParseDisplay for Repeated<T> {
    fn display(&self, depth: usize, _label: Option<String>) {
        for item in self {
            item.display(depth, None);
        }
    }

    fn lexeme_signature(&self) -> String {
        let mut sig = String::new();
        let mut iter = self.into_iter().peekable();
        while let Some(item) = iter.next() {
            sig.push_str(&item.lexeme_signature());
            if iter.peek().is_some() {
                sig.push(' ');
            }
        }
        sig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminals::{Comma, MiniId};
    use crate::ParseBuffer;
    use minimal_lexer::tokenize;

    #[test]
    fn delimited_no_trailing_comma() {
        let tokens = tokenize("a, b, c\n").unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let list = Delimited::<MiniId, Comma>::parse(&mut buffer).unwrap();
        assert_eq!(list.items().len(), 3);
        assert!(buffer.is_at_end());
    }

    #[test]
    fn delimited_empty_is_ok() {
        let tokens = tokenize("1\n").unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let list = Delimited::<MiniId, Comma>::parse(&mut buffer).unwrap();
        assert!(list.is_empty());
    }
}
