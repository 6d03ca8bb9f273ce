//! Printer producing the normal form.
//!
//! Functions are sorted by name, versions appear in dispatch order and
//! blocks in depth-first order from the entry, so printing a reparsed
//! printout reproduces it byte for byte.

use std::fmt::{self, Display, Write as _};

use fir_ir::display::{fmt_jump, write_ident};
use fir_ir::{Abstraction, Cfg, Jump, Module};

const INDENT: &str = "  ";

/// Render `module` in the normal form.
pub fn print_module(module: &Module) -> String {
    ModuleText(module).to_string()
}

/// Render a single version at top level.
pub fn print_abstraction(abstraction: &Abstraction) -> String {
    AbstractionText {
        abstraction,
        depth: 0,
    }
    .to_string()
}

struct ModuleText<'a>(&'a Module);

impl Display for ModuleText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.0;
        for (i, function) in module.functions().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            f.write_str("fun ")?;
            write_ident(f, function.name())?;
            f.write_str(" {\n")?;
            for abstraction in module.versions(function.id()) {
                AbstractionText {
                    abstraction,
                    depth: 1,
                }
                .fmt(f)?;
            }
            f.write_str("}\n")?;
        }
        Ok(())
    }
}

struct AbstractionText<'a> {
    abstraction: &'a Abstraction,
    depth: usize,
}

impl Display for AbstractionText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.abstraction;
        let outer = INDENT.repeat(self.depth);
        let inner = INDENT.repeat(self.depth + 1);
        let body = INDENT.repeat(self.depth + 2);

        write!(f, "{outer}(")?;
        write_list(f, abs.params())?;
        writeln!(f, ") -{}> {} {{", abs.effects(), abs.return_type())?;

        if !abs.locals().is_empty() {
            f.write_str(&inner)?;
            write_list(f, abs.locals())?;
            f.write_char('\n')?;
        }
        writeln!(f, "{outer}|")?;

        let cfg = abs.cfg();
        for id in cfg.depth_first() {
            let Some(block) = cfg.block(id) else { continue };
            f.write_str(&inner)?;
            write_ident(f, block.label())?;
            if !block.params().is_empty() {
                f.write_char('(')?;
                write_list(f, block.params())?;
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
            for statement in block.statements() {
                writeln!(f, "{body}{statement};")?;
            }
            writeln!(
                f,
                "{body}{};",
                LabelledJump {
                    jump: block.jump(),
                    cfg,
                }
            )?;
        }
        writeln!(f, "{outer}}}")
    }
}

/// A jump naming its targets by label.
struct LabelledJump<'a> {
    jump: &'a Jump,
    cfg: &'a Cfg,
}

impl Display for LabelledJump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_jump(f, self.jump, &|id| match self.cfg.block(id) {
            Some(block) => Label(block.label()).to_string(),
            None => id.to_string(),
        })
    }
}

struct Label<'a>(&'a str);

impl Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, self.0)
    }
}

fn write_list<T: Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt(f)?;
    }
    Ok(())
}
