//! Types and effects.
//!
//! `<kind><ownership?><concreteness?>`, where the suffixes follow the kind
//! with no whitespace in between.

use fir_types::{Concreteness, Effects, Kind, Ownership, PrimitiveKind, Type};

use super::Parser;
use crate::cursor::ParseResult;
use crate::ErrorContext;

impl Parser<'_> {
    pub(super) fn ty(&mut self) -> ParseResult<Type> {
        self.within(ErrorContext::Type, |p| {
            let mut ty = Type::new(p.kind()?);
            if let Some(ownership) = p
                .c
                .eat_raw_if(|c| Ownership::from_suffix(c).is_some())
                .and_then(Ownership::from_suffix)
            {
                ty = ty.with_ownership(ownership);
            }
            if let Some(concreteness) = p
                .c
                .eat_raw_if(|c| Concreteness::from_suffix(c).is_some())
                .and_then(Concreteness::from_suffix)
            {
                ty = ty.with_concreteness(concreteness);
            }
            Ok(ty)
        })
    }

    fn kind(&mut self) -> ParseResult<Kind> {
        if self.c.eat("*") {
            Ok(Kind::Any)
        } else if self.c.eat("v(") {
            let primitive = self.primitive()?;
            self.c.expect(")")?;
            Ok(Kind::Vector(primitive))
        } else if self.c.eat("p(") {
            let value = self.ty()?;
            let effects = self.effects()?;
            self.c.expect(")")?;
            Ok(Kind::Promise {
                value: Box::new(value),
                effects,
            })
        } else if self.c.eat("V") {
            Ok(Kind::AnyValue)
        } else if self.c.eat("cls") {
            Ok(Kind::Closure)
        } else {
            self.primitive().map(Kind::Scalar)
        }
    }

    fn primitive(&mut self) -> ParseResult<PrimitiveKind> {
        for primitive in PrimitiveKind::ALL {
            if self.c.eat(primitive.code()) {
                return Ok(primitive);
            }
        }
        Err(self.c.unexpected("a type"))
    }

    pub(super) fn effects(&mut self) -> ParseResult<Effects> {
        self.within(ErrorContext::Effects, |p| {
            p.c.skip_trivia();
            p.c.eat_raw_if(|c| Effects::from_code(c).is_some())
                .and_then(Effects::from_code)
                .ok_or_else(|| p.c.unexpected("`+` or `-`"))
        })
    }
}
