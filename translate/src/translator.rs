use crate::{
    dump,
    translation::{fold, Conditional, Construct, Statement, Translation, TranslationDiscriminants},
    Options, ProcFrag, TranslateError,
};
use ast::{BinaryOp, Expr, Spanned, Stmt, VarDeclaration};
use frame::{
    runtime::{RTLib, RuntimeFunction},
    Frame, FrameFactory,
};
use symtab::{MethodDescriptor, MethodId, SymbolTable};
use tree::{seq, BinOp, Label, RelOp, Stm, TempFactory};
use type_checking::ClassId;

/// Where the traversal currently is. Passed down explicitly instead of
/// living in mutable translator fields.
struct Context {
    class: ClassId,
    method: MethodId,
    frame: Box<dyn Frame>,
}

/// The pieces of a procedure body, folded in this order.
enum BodyItem<'a> {
    Formal(&'a Spanned<VarDeclaration>),
    Local(&'a Spanned<VarDeclaration>),
    Stmt(&'a Spanned<Stmt>),
    Return(&'a Spanned<Expr>),
}

pub struct ProgramTranslator<'t> {
    symtab: &'t mut SymbolTable,
    factory: &'t dyn FrameFactory,
    options: &'t Options,
    runtime: Box<dyn RTLib>,
    temps: TempFactory,
}

impl<'t> ProgramTranslator<'t> {
    pub fn new(
        symtab: &'t mut SymbolTable,
        factory: &'t dyn FrameFactory,
        options: &'t Options,
    ) -> Self {
        ProgramTranslator {
            symtab,
            factory,
            options,
            runtime: options.runtime.lib(),
            temps: TempFactory::new(),
        }
    }

    pub fn translate(mut self, program: &ast::Program) -> Result<Vec<ProcFrag>, TranslateError> {
        let mut fragments = Vec::new();

        let main = &program.main;
        let (class, method) = self.resolve_method(&main.name, &main.method_name)?;
        log::debug!("translate main procedure {}${}", main.name.data, main.method_name.data);
        let items = main
            .locals
            .iter()
            .map(BodyItem::Local)
            .chain(main.statements.iter().map(BodyItem::Stmt))
            .collect();
        fragments.push(self.translate_procedure(class, method, items)?);

        for decl in &program.classes {
            log::debug!("translate class {}", decl.name.data);
            for method_decl in &decl.methods {
                let (class, method) = self.resolve_method(&decl.name, &method_decl.name)?;
                log::debug!("translate method {}${}", decl.name.data, method_decl.name.data);
                let items = method_decl
                    .formals
                    .iter()
                    .map(BodyItem::Formal)
                    .chain(method_decl.locals.iter().map(BodyItem::Local))
                    .chain(method_decl.statements.iter().map(BodyItem::Stmt))
                    .chain(std::iter::once(BodyItem::Return(&method_decl.return_expr)))
                    .collect();
                fragments.push(self.translate_procedure(class, method, items)?);
            }
        }

        if let Some(format) = self.options.dump_fragments {
            dump::log_fragments(&fragments, format);
        }
        Ok(fragments)
    }

    fn resolve_method(
        &self,
        class_name: &str,
        method_name: &str,
    ) -> Result<(ClassId, MethodId), TranslateError> {
        let class = self
            .symtab
            .lookup_class(class_name)
            .ok_or_else(|| TranslateError::UnknownClass {
                name: class_name.to_string(),
            })?;
        let method = class
            .method_id(method_name)
            .ok_or_else(|| TranslateError::UnknownMethod {
                class: class_name.to_string(),
                name: method_name.to_string(),
            })?;
        Ok((class.id, method))
    }

    fn method(&self, ctx: &Context) -> &MethodDescriptor {
        self.symtab.class(ctx.class).method(ctx.method)
    }

    fn method_mut(&mut self, ctx: &Context) -> &mut MethodDescriptor {
        self.symtab.method_mut(ctx.class, ctx.method)
    }

    fn translate_procedure(
        &mut self,
        class: ClassId,
        method: MethodId,
        items: Vec<BodyItem<'_>>,
    ) -> Result<ProcFrag, TranslateError> {
        let label = {
            let class = self.symtab.class(class);
            Label::new(format!("{}${}", class.name, class.method(method).name))
        };

        // escape analysis is not implemented
        let escapes = vec![false; self.symtab.class(class).method(method).parameters().len()];
        let frame = self.factory.new_frame(label, &escapes, &mut self.temps);

        let descriptor = self.symtab.method_mut(class, method);
        for (param, access) in descriptor.parameters_mut().iter_mut().zip(frame.formals()) {
            param.access = Some(*access);
        }
        let mut ctx = Context {
            class,
            method,
            frame,
        };

        self.check_balanced(&ctx)?;
        let body = self.with_block(&mut ctx, |this, ctx| this.translate_items(ctx, items))?;
        self.check_balanced(&ctx)?;

        let body = body.as_stm(&mut self.temps)?;
        let body = ctx.frame.proc_entry_exit1(body);
        log::trace!("{}: {}", ctx.frame.name(), body);
        Ok(ProcFrag {
            frame: ctx.frame,
            body,
        })
    }

    fn check_balanced(&self, ctx: &Context) -> Result<(), TranslateError> {
        let method = self.method(ctx);
        match method.depth() {
            0 => Ok(()),
            depth => Err(TranslateError::ScopeImbalance {
                method: method.name.clone(),
                depth,
            }),
        }
    }

    /// Run `f` inside a new block of the current method. The block is left
    /// even if `f` fails.
    fn with_block<F>(&mut self, ctx: &mut Context, f: F) -> Result<Translation, TranslateError>
    where
        F: FnOnce(&mut Self, &mut Context) -> Result<Translation, TranslateError>,
    {
        self.method_mut(ctx).enter_block();
        let result = f(self, ctx);
        let left = self.method_mut(ctx).leave_block();
        let translation = result?;
        left?;
        Ok(translation)
    }

    fn translate_items(
        &mut self,
        ctx: &mut Context,
        items: Vec<BodyItem<'_>>,
    ) -> Result<Translation, TranslateError> {
        let mut translated = Vec::with_capacity(items.len());
        for item in items {
            translated.push(match item {
                BodyItem::Formal(formal) => self.translate_formal(ctx, formal)?,
                BodyItem::Local(local) => self.translate_local(ctx, local)?,
                BodyItem::Stmt(stmt) => self.translate_stmt(ctx, stmt)?,
                BodyItem::Return(expr) => {
                    let value = self.translate_expr(ctx, expr)?.as_expr(&mut self.temps)?;
                    let rv = tree::Expr::Temp(ctx.frame.rv());
                    Translation::Statement(Statement::Stm(Stm::mov(rv, value)))
                }
            });
        }
        fold(translated, &mut self.temps)
    }

    /// Move the incoming value into a fresh home and rebind the parameter
    /// to it.
    fn translate_formal(
        &mut self,
        ctx: &mut Context,
        formal: &Spanned<VarDeclaration>,
    ) -> Result<Translation, TranslateError> {
        let home = ctx.frame.alloc_local(false, &mut self.temps);
        let fp = tree::Expr::Temp(ctx.frame.fp());

        let name = &formal.name.data;
        let method = self.method_mut(ctx);
        let method_name = method.name.clone();
        let param = method
            .lookup_parameter_mut(name)
            .ok_or_else(|| TranslateError::UnresolvedIdentifier {
                name: name.clone(),
                method: method_name,
            })?;
        let incoming = param
            .access
            .ok_or_else(|| TranslateError::UnboundAccess { name: name.clone() })?;
        param.access = Some(home);

        Ok(Translation::Expression(tree::Expr::eseq(
            Stm::mov(home.exp(fp.clone()), incoming.exp(fp.clone())),
            home.exp(fp),
        )))
    }

    fn translate_local(
        &mut self,
        ctx: &mut Context,
        local: &Spanned<VarDeclaration>,
    ) -> Result<Translation, TranslateError> {
        let access = ctx.frame.alloc_local(false, &mut self.temps);
        let fp = tree::Expr::Temp(ctx.frame.fp());

        let name = &local.name.data;
        let method = self.method_mut(ctx);
        let method_name = method.name.clone();
        let var = method
            .lookup_local_mut(name)
            .ok_or_else(|| TranslateError::UnresolvedIdentifier {
                name: name.clone(),
                method: method_name,
            })?;
        var.access = Some(access);

        Ok(Translation::Expression(access.exp(fp)))
    }

    /// Locals shadow parameters, parameters shadow fields.
    fn resolve_variable(
        &self,
        ctx: &Context,
        name: &Spanned<String>,
    ) -> Result<Translation, TranslateError> {
        let method = self.method(ctx);
        let var = method
            .lookup_local(name)
            .or_else(|| method.lookup_parameter(name));

        if let Some(var) = var {
            let access = var.access.ok_or_else(|| TranslateError::UnboundAccess {
                name: name.data.clone(),
            })?;
            return Ok(Translation::Expression(
                access.exp(tree::Expr::Temp(ctx.frame.fp())),
            ));
        }

        if self.symtab.lookup_field(ctx.class, name).is_some() {
            return Ok(Translation::Unlowered(Construct::FieldAccess(
                name.data.clone(),
            )));
        }

        Err(TranslateError::UnresolvedIdentifier {
            name: name.data.clone(),
            method: method.name.clone(),
        })
    }

    fn translate_stmt(
        &mut self,
        ctx: &mut Context,
        stmt: &Spanned<Stmt>,
    ) -> Result<Translation, TranslateError> {
        let translation = match &stmt.data {
            Stmt::Block { locals, statements } => {
                let items = locals
                    .iter()
                    .map(BodyItem::Local)
                    .chain(statements.iter().map(BodyItem::Stmt))
                    .collect();
                self.with_block(ctx, |this, ctx| this.translate_items(ctx, items))?
            }
            Stmt::If { cond, then } => Translation::Statement(Statement::If {
                cond: Box::new(self.translate_expr(ctx, cond)?),
                then: Box::new(self.translate_stmt(ctx, then)?),
            }),
            Stmt::IfElse {
                cond,
                then,
                otherwise,
            } => Translation::Statement(Statement::IfElse {
                cond: Box::new(self.translate_expr(ctx, cond)?),
                then: Box::new(self.translate_stmt(ctx, then)?),
                otherwise: Box::new(self.translate_stmt(ctx, otherwise)?),
            }),
            Stmt::While { cond, body } => self.translate_while(ctx, cond, body)?,
            Stmt::Println(value) => {
                let value = self.translate_expr(ctx, value)?.as_expr(&mut self.temps)?;
                let println = self.runtime.ld_name(RuntimeFunction::Println);
                Translation::Expression(ctx.frame.external_call(println, vec![value]))
            }
            Stmt::Assign { name, value } => match self.resolve_variable(ctx, name)? {
                Translation::Expression(target) => {
                    let value = self.translate_expr(ctx, value)?.as_expr(&mut self.temps)?;
                    Translation::Statement(Statement::Stm(Stm::mov(target, value)))
                }
                other => other,
            },
            Stmt::ArrayAssign { name, index, value } => match self.resolve_variable(ctx, name)? {
                Translation::Expression(base) => {
                    let index = self.translate_expr(ctx, index)?.as_expr(&mut self.temps)?;
                    let value = self.translate_expr(ctx, value)?.as_expr(&mut self.temps)?;
                    // no bounds check and no element scaling at this level
                    let element = tree::Expr::binop(BinOp::Plus, base, index);
                    Translation::Statement(Statement::Stm(Stm::mov(element, value)))
                }
                other => other,
            },
        };
        log::trace!(
            "statement at {} lowered to {}",
            stmt.site,
            TranslationDiscriminants::from(&translation)
        );
        Ok(translation)
    }

    fn translate_while(
        &mut self,
        ctx: &mut Context,
        cond: &Spanned<Expr>,
        body: &Spanned<Stmt>,
    ) -> Result<Translation, TranslateError> {
        let test = self.temps.new_label();
        let loop_body = self.temps.new_label();
        let exit = self.temps.new_label();

        let cond = self
            .translate_expr(ctx, cond)?
            .as_cond(loop_body.clone(), exit.clone())?;
        let body = self.translate_stmt(ctx, body)?.as_stm(&mut self.temps)?;

        Ok(Translation::Statement(Statement::Stm(seq![
            Stm::Label(test.clone()),
            cond,
            Stm::Label(loop_body),
            body,
            Stm::jump(test),
            Stm::Label(exit)
        ])))
    }

    fn translate_expr(
        &mut self,
        ctx: &mut Context,
        expr: &Spanned<Expr>,
    ) -> Result<Translation, TranslateError> {
        let translation = match &expr.data {
            Expr::Binary(op, lhs, rhs) => self.translate_binary(ctx, *op, lhs, rhs)?,
            Expr::Not(operand) => self.translate_expr(ctx, operand)?.negate(&mut self.temps)?,
            Expr::Int(literal) => Translation::Expression(parse_literal(literal)?),
            Expr::True => Translation::Expression(tree::Expr::Const(1)),
            Expr::False => Translation::Expression(tree::Expr::Const(0)),
            Expr::Identifier(name) => self.resolve_variable(ctx, name)?,
            Expr::MethodInvocation { name, .. } => {
                Translation::Unlowered(Construct::MethodInvocation(name.data.clone()))
            }
            Expr::ArrayAccess { .. } => Translation::Unlowered(Construct::ArrayAccess),
            Expr::ArrayLength(_) => Translation::Unlowered(Construct::ArrayLength),
            Expr::NewInstance(class) => {
                Translation::Unlowered(Construct::NewInstance(class.data.clone()))
            }
            Expr::NewIntArray(_) => Translation::Unlowered(Construct::NewIntArray),
            Expr::This => Translation::Unlowered(Construct::This),
        };
        Ok(translation)
    }

    fn translate_binary(
        &mut self,
        ctx: &mut Context,
        op: BinaryOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
    ) -> Result<Translation, TranslateError> {
        let arithmetic = match op {
            BinaryOp::Add => Some(BinOp::Plus),
            BinaryOp::Sub => Some(BinOp::Minus),
            BinaryOp::Mul => Some(BinOp::Mul),
            _ => None,
        };
        let relation = relation(op);
        if arithmetic.is_none() && relation.is_none() {
            let construct = match op {
                BinaryOp::And => Construct::And,
                _ => Construct::Or,
            };
            return Ok(Translation::Unlowered(construct));
        }

        let left = self.translate_expr(ctx, lhs)?.as_expr(&mut self.temps)?;
        let right = self.translate_expr(ctx, rhs)?.as_expr(&mut self.temps)?;
        Ok(match (arithmetic, relation) {
            (Some(op), _) => Translation::Expression(tree::Expr::binop(op, left, right)),
            (None, Some(op)) => Translation::Conditional(Conditional::Relational { op, left, right }),
            (None, None) => unreachable!("logical operators return early"),
        })
    }
}

fn relation(op: BinaryOp) -> Option<RelOp> {
    match op {
        BinaryOp::Equals => Some(RelOp::Eq),
        BinaryOp::NotEquals => Some(RelOp::Ne),
        BinaryOp::LessThan => Some(RelOp::Lt),
        BinaryOp::LessEquals => Some(RelOp::Le),
        BinaryOp::GreaterThan => Some(RelOp::Gt),
        BinaryOp::GreaterEquals => Some(RelOp::Ge),
        _ => None,
    }
}

/// A trailing `l` or `L` selects a wide constant.
fn parse_literal(literal: &str) -> Result<tree::Expr, TranslateError> {
    let invalid = || TranslateError::InvalidLiteral {
        literal: literal.to_string(),
    };
    if literal.ends_with('l') || literal.ends_with('L') {
        let digits = &literal[..literal.len() - 1];
        digits
            .parse::<i64>()
            .map(tree::Expr::LongConst)
            .map_err(|_| invalid())
    } else {
        literal
            .parse::<i32>()
            .map(tree::Expr::Const)
            .map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::assert_matches;

    #[test]
    fn literals() {
        assert_eq!(tree::Expr::Const(42), parse_literal("42").unwrap());
        assert_eq!(
            tree::Expr::LongConst(10_000_000_000),
            parse_literal("10000000000L").unwrap()
        );
        assert_eq!(tree::Expr::LongConst(7), parse_literal("7l").unwrap());
        assert_matches!(
            parse_literal("10000000000"),
            Err(TranslateError::InvalidLiteral { .. })
        );
        assert_matches!(parse_literal("L"), Err(TranslateError::InvalidLiteral { .. }));
    }

    #[test]
    fn relations_cover_comparisons_only() {
        assert_eq!(Some(RelOp::Le), relation(BinaryOp::LessEquals));
        assert_eq!(None, relation(BinaryOp::And));
        assert_eq!(None, relation(BinaryOp::Add));
    }
}
