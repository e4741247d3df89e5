//! Name resolution for parsed constraint expressions.

use crate::error::CompileError;
use crate::expr::{Disjunct, Expr, FieldDecl};
use crate::parser::parse;

/// The field names of the host struct a constraint is written against.
///
/// A closed namespace rejects root struct literals that declare labels the
/// host does not have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    names: Vec<String>,
    closed: bool,
}

impl Namespace {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn open<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            closed: false,
        }
    }

    pub fn closed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            closed: true,
            ..Self::open(names)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Where a compiled expression is unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A field tag. Bare identifiers name sibling fields.
    Field,

    /// A type-level constraint unified with the whole value. Struct literals
    /// in root position may refer to the host's fields.
    Root,
}

/// Parses and resolves constraint text.
pub fn compile(
    src: &str,
    namespace: &Namespace,
    placement: Placement,
) -> Result<Expr, CompileError> {
    let expr = parse(src)?;
    resolve(expr, namespace, placement)
}

/// Resolves identifiers and calls of a parsed expression.
pub fn resolve(
    expr: Expr,
    namespace: &Namespace,
    placement: Placement,
) -> Result<Expr, CompileError> {
    let mut resolver = Resolver {
        namespace,
        scopes: Vec::new(),
    };
    match placement {
        Placement::Field => {
            resolver.scopes.push(namespace.names.clone());
            resolver.resolve(expr, false)
        }
        Placement::Root => resolver.resolve(expr, true),
    }
}

struct Resolver<'a> {
    namespace: &'a Namespace,
    scopes: Vec<Vec<String>>,
}

impl Resolver<'_> {
    fn resolve(&mut self, expr: Expr, root: bool) -> Result<Expr, CompileError> {
        let resolved = match expr {
            Expr::Literal(_) | Expr::Ref { .. } => expr,
            Expr::Ident(name) => self.lookup(name)?,
            Expr::Bound(op, limit) => Expr::Bound(op, self.boxed(*limit)?),
            Expr::Select(base, name) => Expr::Select(self.boxed(*base)?, name),
            Expr::Index(base, index) => Expr::Index(self.boxed(*base)?, self.boxed(*index)?),
            Expr::Call(name, args) => {
                let builtin = crate::expr::Builtin::from_name(&name)
                    .ok_or(CompileError::UnknownBuiltin(name))?;
                if args.len() != builtin.arity() {
                    return Err(CompileError::Arity {
                        name: builtin.name(),
                        expected: builtin.arity(),
                        got: args.len(),
                    });
                }
                Expr::Builtin(builtin, self.all(args)?)
            }
            Expr::Builtin(builtin, args) => Expr::Builtin(builtin, self.all(args)?),
            Expr::Unary(op, operand) => Expr::Unary(op, self.boxed(*operand)?),
            Expr::Binary(op, lhs, rhs) => Expr::Binary(op, self.boxed(*lhs)?, self.boxed(*rhs)?),
            Expr::Unify(lhs, rhs) => Expr::Unify(
                Box::new(self.resolve(*lhs, root)?),
                Box::new(self.resolve(*rhs, root)?),
            ),
            Expr::Disjunction(disjuncts) => Expr::Disjunction(
                disjuncts
                    .into_iter()
                    .map(|d| {
                        Ok(Disjunct {
                            expr: self.resolve(d.expr, root)?,
                            default: d.default,
                        })
                    })
                    .collect::<Result<_, CompileError>>()?,
            ),
            // A default marker outside a disjunction has nothing to select from.
            Expr::Default(inner) => self.resolve(*inner, root)?,
            Expr::Struct(decls) => self.struct_literal(decls, root)?,
            Expr::List { elems, tail } => Expr::List {
                elems: self.all(elems)?,
                tail: match tail {
                    Some(tail) => Some(self.boxed(*tail)?),
                    None => None,
                },
            },
        };
        Ok(resolved)
    }

    fn struct_literal(&mut self, decls: Vec<FieldDecl>, root: bool) -> Result<Expr, CompileError> {
        let mut scope: Vec<String> = decls.iter().map(|d| d.label.clone()).collect();

        if root {
            if self.namespace.closed {
                if let Some(unknown) = decls.iter().find(|d| !self.namespace.contains(&d.label)) {
                    return Err(CompileError::UnknownField(unknown.label.clone()));
                }
            }
            for name in &self.namespace.names {
                if !scope.contains(name) {
                    scope.push(name.clone());
                }
            }
        }

        self.scopes.push(scope);
        let resolved = decls
            .into_iter()
            .map(|decl| {
                Ok(FieldDecl {
                    value: self.resolve(decl.value, false)?,
                    ..decl
                })
            })
            .collect::<Result<Vec<_>, CompileError>>();
        self.scopes.pop();

        Ok(Expr::Struct(resolved?))
    }

    fn lookup(&self, name: String) -> Result<Expr, CompileError> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains(&name) {
                return Ok(Expr::Ref { depth, name });
            }
        }
        Err(CompileError::Unresolved(name))
    }

    fn boxed(&mut self, expr: Expr) -> Result<Box<Expr>, CompileError> {
        Ok(Box::new(self.resolve(expr, false)?))
    }

    fn all(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>, CompileError> {
        exprs
            .into_iter()
            .map(|expr| self.resolve(expr, false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Builtin};

    fn sum_fields() -> Namespace {
        Namespace::closed(["a", "b", "c"])
    }

    #[test]
    fn test_field_references() {
        let expr = compile("c - b", &sum_fields(), Placement::Field).unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::reference(0, "c"),
                Expr::reference(0, "b")
            )
        );
    }

    #[test]
    fn test_unresolved_reference() {
        let err = compile("a + d", &sum_fields(), Placement::Field).unwrap_err();
        assert_eq!(err, CompileError::Unresolved("d".into()));

        // Root constraints have no implicit scope.
        let err = compile("a", &sum_fields(), Placement::Root).unwrap_err();
        assert_eq!(err, CompileError::Unresolved("a".into()));
    }

    #[test]
    fn test_nested_literal_depths() {
        let expr = compile("{x: a, y: x}", &sum_fields(), Placement::Field).unwrap();
        let Expr::Struct(decls) = expr else {
            panic!("expected struct");
        };
        assert_eq!(decls[0].value, Expr::reference(1, "a"));
        assert_eq!(decls[1].value, Expr::reference(0, "x"));
    }

    #[test]
    fn test_root_literal_sees_host_fields() {
        let ns = Namespace::closed(["a", "b"]);
        let expr = compile("{a: b + 1} & {b: 2}", &ns, Placement::Root).unwrap();
        let Expr::Unify(lhs, _) = expr else {
            panic!("expected unification");
        };
        let Expr::Struct(decls) = *lhs else {
            panic!("expected struct");
        };
        assert_eq!(
            decls[0].value,
            Expr::binary(BinaryOp::Add, Expr::reference(0, "b"), Expr::int(1))
        );
    }

    #[test]
    fn test_root_literal_in_closed_namespace() {
        let err = compile("{z: 1}", &sum_fields(), Placement::Root).unwrap_err();
        assert_eq!(err, CompileError::UnknownField("z".into()));
        assert!(compile("{z: 1}", &Namespace::open(["a"]), Placement::Root).is_ok());
    }

    #[test]
    fn test_builtins() {
        let expr = compile("len(a)", &sum_fields(), Placement::Field).unwrap();
        assert_eq!(
            expr,
            Expr::Builtin(Builtin::Len, vec![Expr::reference(0, "a")])
        );
        assert_eq!(
            compile("max(a)", &sum_fields(), Placement::Field).unwrap_err(),
            CompileError::UnknownBuiltin("max".into())
        );
        assert!(matches!(
            compile("mod(a)", &sum_fields(), Placement::Field).unwrap_err(),
            CompileError::Arity { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        assert!(matches!(
            compile("a &", &sum_fields(), Placement::Field).unwrap_err(),
            CompileError::Syntax(_)
        ));
    }
}
