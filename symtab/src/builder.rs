use crate::{method::MethodDescriptor, ClassId, MethodId, SymbolTable};
use ast::{Site, Spanned, Stmt, TypeExpr, VarDeclaration};
use diagnostics::{Diagnostics, ErrorKind};
use type_checking::Type;

/// The declaration pass: creates a descriptor for every class, field,
/// method, parameter and local of a program.
///
/// Blocks are entered and left at exactly the places the translator
/// enters and leaves them: once around each method body and once per
/// block statement.
pub struct SymbolTableBuilder<'d> {
    symtab: SymbolTable,
    diagnostics: &'d Diagnostics,
}

impl<'d> SymbolTableBuilder<'d> {
    pub fn build(program: &ast::Program, diagnostics: &'d Diagnostics) -> SymbolTable {
        let mut builder = SymbolTableBuilder {
            symtab: SymbolTable::new(),
            diagnostics,
        };

        let main_id = builder.declare_class(&program.main.name);
        let class_ids: Vec<_> = program
            .classes
            .iter()
            .map(|class| builder.declare_class(&class.name))
            .collect();

        for (class, id) in program.classes.iter().zip(&class_ids) {
            if let (Some(id), Some(extends)) = (id, &class.extends) {
                builder.link_superclass(*id, extends);
            }
        }

        if let Some(id) = main_id {
            builder.declare_main(id, &program.main);
        }
        for (class, id) in program.classes.iter().zip(&class_ids) {
            if let Some(id) = id {
                builder.declare_members(*id, class);
            }
        }

        log::debug!(
            "declared {} classes with {} errors",
            builder.symtab.classes().count(),
            diagnostics.count()
        );
        builder.symtab
    }

    fn error(&self, site: Site, kind: ErrorKind, args: Vec<String>) {
        self.diagnostics.error(kind.on(site.line, site.column, args));
    }

    fn declare_class(&mut self, name: &Spanned<String>) -> Option<ClassId> {
        match self.symtab.add_class(name, name.site) {
            Ok(id) => Some(id),
            Err(_) => {
                self.error(name.site, ErrorKind::DuplicateClass, vec![name.data.clone()]);
                None
            }
        }
    }

    fn link_superclass(&mut self, id: ClassId, extends: &Spanned<String>) {
        let superclass = match self.symtab.lookup_class(extends) {
            Some(class) => class.id,
            None => {
                self.error(extends.site, ErrorKind::UndefinedClass, vec![extends.data.clone()]);
                return;
            }
        };

        // reject the link if it closes a cycle
        let mut current = Some(superclass);
        while let Some(ancestor) = current {
            if ancestor == id {
                let name = self.symtab.class(id).name.clone();
                self.error(extends.site, ErrorKind::CyclicInheritance, vec![name]);
                return;
            }
            current = self.symtab.class(ancestor).superclass();
        }
        self.symtab.class_mut(id).set_superclass(Some(superclass));
    }

    fn resolve_type(&self, ty: &Spanned<TypeExpr>) -> Type {
        match &ty.data {
            TypeExpr::Int => Type::Int,
            TypeExpr::IntArray => Type::IntArray,
            TypeExpr::Boolean => Type::Boolean,
            TypeExpr::Class(name) => match self.symtab.lookup_class(name) {
                Some(class) => Type::Class(class.id),
                None => {
                    self.error(ty.site, ErrorKind::UndefinedClass, vec![name.clone()]);
                    Type::Undefined
                }
            },
        }
    }

    fn declare_main(&mut self, class: ClassId, main: &ast::MainClass) {
        let descriptor = MethodDescriptor::new(&main.method_name, None, main.method_name.site);
        let method = match self.symtab.class_mut(class).add_method(descriptor) {
            Ok(method) => method,
            Err(_) => return,
        };
        self.declare_body(class, method, &main.locals, &main.statements);
    }

    fn declare_members(&mut self, class: ClassId, decl: &ast::ClassDeclaration) {
        for field in &decl.fields {
            let ty = self.resolve_type(&field.ty);
            if self
                .symtab
                .class_mut(class)
                .add_field(&field.name, ty, field.name.site)
                .is_err()
            {
                self.error(
                    field.name.site,
                    ErrorKind::DuplicateField,
                    vec![field.name.data.clone(), decl.name.data.clone()],
                );
            }
        }

        for method in &decl.methods {
            let return_ty = self.resolve_type(&method.return_ty);
            let descriptor = MethodDescriptor::new(&method.name, Some(return_ty), method.name.site);
            let id = match self.symtab.class_mut(class).add_method(descriptor) {
                Ok(id) => id,
                Err(_) => {
                    self.error(
                        method.name.site,
                        ErrorKind::DuplicateMethod,
                        vec![method.name.data.clone(), decl.name.data.clone()],
                    );
                    continue;
                }
            };

            for formal in &method.formals {
                let ty = self.resolve_type(&formal.ty);
                let descriptor = self.symtab.method_mut(class, id);
                if descriptor.lookup_parameter(&formal.name).is_some() {
                    self.error(
                        formal.name.site,
                        ErrorKind::DuplicateParameter,
                        vec![formal.name.data.clone(), method.name.data.clone()],
                    );
                    continue;
                }
                let added = descriptor
                    .add_parameter(&formal.name, ty, formal.name.site)
                    .map(|_| ());
                if let Err(err) = added {
                    self.error(formal.name.site, ErrorKind::Internal, vec![err.to_string()]);
                }
            }

            self.declare_body(class, id, &method.locals, &method.statements);
        }
    }

    fn declare_body(
        &mut self,
        class: ClassId,
        method: MethodId,
        locals: &[Spanned<VarDeclaration>],
        statements: &[Spanned<Stmt>],
    ) {
        self.symtab.method_mut(class, method).enter_block();
        self.declare_block_contents(class, method, locals, statements);
        self.leave_block(class, method);
    }

    fn declare_block_contents(
        &mut self,
        class: ClassId,
        method: MethodId,
        locals: &[Spanned<VarDeclaration>],
        statements: &[Spanned<Stmt>],
    ) {
        for local in locals {
            let ty = self.resolve_type(&local.ty);
            let descriptor = self.symtab.method_mut(class, method);
            if descriptor.is_declared_in_current_block(&local.name) {
                self.error(
                    local.name.site,
                    ErrorKind::DuplicateVariable,
                    vec![local.name.data.clone()],
                );
                continue;
            }
            let added = descriptor
                .add_local(&local.name, ty, local.name.site)
                .map(|_| ());
            if let Err(err) = added {
                self.error(local.name.site, ErrorKind::Internal, vec![err.to_string()]);
            }
        }
        for stmt in statements {
            self.declare_stmt(class, method, stmt);
        }
    }

    fn declare_stmt(&mut self, class: ClassId, method: MethodId, stmt: &Spanned<Stmt>) {
        match &stmt.data {
            Stmt::Block { locals, statements } => {
                self.declare_body(class, method, locals, statements);
            }
            Stmt::If { then, .. } => self.declare_stmt(class, method, then),
            Stmt::IfElse {
                then, otherwise, ..
            } => {
                self.declare_stmt(class, method, then);
                self.declare_stmt(class, method, otherwise);
            }
            Stmt::While { body, .. } => self.declare_stmt(class, method, body),
            Stmt::Println(_) | Stmt::Assign { .. } | Stmt::ArrayAssign { .. } => {}
        }
    }

    fn leave_block(&mut self, class: ClassId, method: MethodId) {
        let descriptor = self.symtab.method_mut(class, method);
        if let Err(err) = descriptor.leave_block() {
            let site = descriptor.site;
            self.error(site, ErrorKind::Internal, vec![err.to_string()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{ClassDeclaration, Expr, MainClass, MethodDeclaration, Program};
    use utils::assert_matches;

    fn name(name: &str) -> Spanned<String> {
        Spanned::dummy(name.to_string())
    }

    fn main_class(locals: Vec<Spanned<VarDeclaration>>, statements: Vec<Spanned<Stmt>>) -> MainClass {
        MainClass {
            name: name("Main"),
            method_name: name("main"),
            args_name: name("args"),
            locals,
            statements,
        }
    }

    fn class(
        class_name: &str,
        extends: Option<&str>,
        fields: Vec<Spanned<VarDeclaration>>,
        methods: Vec<Spanned<MethodDeclaration>>,
    ) -> Spanned<ClassDeclaration> {
        Spanned::dummy(ClassDeclaration {
            name: name(class_name),
            extends: extends.map(name),
            fields,
            methods,
        })
    }

    fn method(
        method_name: &str,
        formals: Vec<Spanned<VarDeclaration>>,
        locals: Vec<Spanned<VarDeclaration>>,
        statements: Vec<Spanned<Stmt>>,
    ) -> Spanned<MethodDeclaration> {
        Spanned::dummy(MethodDeclaration {
            return_ty: Spanned::dummy(TypeExpr::Int),
            name: name(method_name),
            formals,
            locals,
            statements,
            return_expr: Box::new(Expr::int(0)),
        })
    }

    #[test]
    fn declares_everything_with_balanced_blocks() {
        let nested = Spanned::dummy(Stmt::Block {
            locals: vec![VarDeclaration::new(TypeExpr::Boolean, "x")],
            statements: vec![],
        });
        let program = Program {
            main: main_class(vec![VarDeclaration::new(TypeExpr::Int, "i")], vec![]),
            classes: vec![class(
                "Foo",
                None,
                vec![VarDeclaration::new(TypeExpr::IntArray, "data")],
                vec![method(
                    "bar",
                    vec![VarDeclaration::new(TypeExpr::Class("Foo".into()), "other")],
                    vec![VarDeclaration::new(TypeExpr::Int, "x")],
                    vec![nested],
                )],
            )],
        };

        let diagnostics = Diagnostics::dummy();
        let symtab = SymbolTableBuilder::build(&program, &diagnostics);
        assert!(!diagnostics.errored());

        let foo = symtab.lookup_class("Foo").unwrap();
        assert_eq!(Type::IntArray, foo.lookup_field("data").unwrap().ty);
        let bar = foo.lookup_method("bar").unwrap();
        assert_eq!(0, bar.depth());
        assert_eq!(Type::Class(foo.id), bar.parameters()[0].ty);
        // one parameter plus two locals named x
        assert_eq!(3, bar.num_variables());

        let main = symtab.lookup_class("Main").unwrap().lookup_method("main").unwrap();
        assert_eq!(None, main.return_ty);
        assert_eq!(1, main.num_variables());
    }

    #[test]
    fn reports_declaration_errors() {
        let program = Program {
            main: main_class(
                vec![
                    VarDeclaration::new(TypeExpr::Int, "i"),
                    VarDeclaration::new(TypeExpr::Int, "i"),
                ],
                vec![],
            ),
            classes: vec![
                class("A", Some("Missing"), vec![], vec![]),
                class("A", None, vec![], vec![]),
                class(
                    "B",
                    None,
                    vec![VarDeclaration::new(TypeExpr::Class("Nope".into()), "f")],
                    vec![
                        method(
                            "m",
                            vec![
                                VarDeclaration::new(TypeExpr::Int, "p"),
                                VarDeclaration::new(TypeExpr::Int, "p"),
                            ],
                            vec![],
                            vec![],
                        ),
                        method("m", vec![], vec![], vec![]),
                    ],
                ),
            ],
        };

        let diagnostics = Diagnostics::dummy();
        let symtab = SymbolTableBuilder::build(&program, &diagnostics);
        let errors = diagnostics.errors();
        let kinds: Vec<_> = errors.iter().map(|error| error.kind).collect();
        assert_eq!(
            vec![
                ErrorKind::DuplicateClass,
                ErrorKind::UndefinedClass,
                ErrorKind::DuplicateVariable,
                ErrorKind::UndefinedClass,
                ErrorKind::DuplicateParameter,
                ErrorKind::DuplicateMethod,
            ],
            kinds
        );

        let b = symtab.lookup_class("B").unwrap();
        assert_eq!(Type::Undefined, b.lookup_field("f").unwrap().ty);
        assert_matches!(symtab.lookup_class("A").unwrap().superclass(), None);
    }

    #[test]
    fn rejects_cyclic_inheritance() {
        let program = Program {
            main: main_class(vec![], vec![]),
            classes: vec![class("A", Some("B"), vec![], vec![]), class("B", Some("A"), vec![], vec![])],
        };
        let diagnostics = Diagnostics::dummy();
        let symtab = SymbolTableBuilder::build(&program, &diagnostics);
        assert_eq!(diagnostics.errors()[0], ErrorKind::CyclicInheritance);
        let a = symtab.lookup_class("A").unwrap();
        assert_eq!(symtab.lookup_class("B").map(|b| b.id), a.superclass());
    }
}
