//! Flat symbol table.
//!
//! One table per compilation unit: there is no lexical block scoping, so a
//! name declared anywhere is visible everywhere after that point. Lookup is
//! a linear scan over the insertion-ordered store; redeclaration in the
//! same table fails without mutating the existing binding. Classes carry
//! two nested child tables (members, methods), each enforcing the same
//! rule independently.

use inkwell::values::PointerValue;

use desim_ir::ast::{Attribute, Param};
use desim_ir::DataType;

use crate::error::CodegenError;

/// What role a symbol plays, beyond its value type.
#[derive(Clone, Debug, Default)]
pub enum SymbolInfo {
    /// Ordinary variable.
    #[default]
    Variable,
    /// Entity declaration with its attribute list.
    Entity { attributes: Vec<Attribute> },
    /// Event declaration with its parameter list.
    Event { params: Vec<Param> },
    /// Function or method declaration with its parameter list.
    Function { params: Vec<Param> },
    /// Class declaration: optional parent plus nested tables.
    Class {
        parent: Option<String>,
        members: Box<SymbolTable<'static>>,
        methods: Box<SymbolTable<'static>>,
    },
}

/// One binding.
#[derive(Clone, Debug)]
pub struct Symbol<'ll> {
    pub name: String,
    pub ty: DataType,
    pub initialized: bool,
    /// The stack slot holding the value, once allocated.
    pub storage: Option<PointerValue<'ll>>,
    pub info: SymbolInfo,
}

/// Growable, insertion-ordered symbol store.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable<'ll> {
    symbols: Vec<Symbol<'ll>>,
}

impl<'ll> SymbolTable<'ll> {
    pub fn new() -> Self {
        SymbolTable {
            symbols: Vec::new(),
        }
    }

    fn insert(&mut self, symbol: Symbol<'ll>) -> Result<(), CodegenError> {
        if self.lookup(&symbol.name).is_some() {
            return Err(CodegenError::redeclaration(&symbol.name));
        }
        self.symbols.push(symbol);
        Ok(())
    }

    /// Declare an ordinary variable, uninitialized.
    pub fn add(&mut self, name: &str, ty: DataType) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty,
            initialized: false,
            storage: None,
            info: SymbolInfo::Variable,
        })
    }

    /// Declare an entity. Entities are considered initialized on
    /// declaration; they have no storage of their own.
    pub fn add_entity(&mut self, name: &str, attributes: Vec<Attribute>) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty: DataType::Void,
            initialized: true,
            storage: None,
            info: SymbolInfo::Entity { attributes },
        })
    }

    /// Declare an event.
    pub fn add_event(&mut self, name: &str, params: Vec<Param>) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty: DataType::Void,
            initialized: true,
            storage: None,
            info: SymbolInfo::Event { params },
        })
    }

    /// Declare a function; `ty` is its return type.
    pub fn add_function(
        &mut self,
        name: &str,
        return_ty: DataType,
        params: Vec<Param>,
    ) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty: return_ty,
            initialized: true,
            storage: None,
            info: SymbolInfo::Function { params },
        })
    }

    /// Declare a class with fresh member and method child tables.
    pub fn add_class(&mut self, name: &str, parent: Option<&str>) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty: DataType::Void,
            initialized: true,
            storage: None,
            info: SymbolInfo::Class {
                parent: parent.map(str::to_owned),
                members: Box::new(SymbolTable::new()),
                methods: Box::new(SymbolTable::new()),
            },
        })
    }

    /// Declare a member variable inside a class's member table.
    pub fn add_member(&mut self, name: &str, ty: DataType) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty,
            initialized: false,
            storage: None,
            info: SymbolInfo::Variable,
        })
    }

    /// Declare a method inside a class's method table.
    pub fn add_method(
        &mut self,
        name: &str,
        return_ty: DataType,
        params: Vec<Param>,
    ) -> Result<(), CodegenError> {
        self.insert(Symbol {
            name: name.to_owned(),
            ty: return_ty,
            initialized: true,
            storage: None,
            info: SymbolInfo::Function { params },
        })
    }

    /// Linear-scan lookup.
    pub fn lookup(&self, name: &str) -> Option<&Symbol<'ll>> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol<'ll>> {
        self.symbols.iter_mut().find(|s| s.name == name)
    }

    /// Attach a storage slot to a symbol. Initialization is tracked
    /// separately: a slot exists from declaration, but the symbol only
    /// becomes readable after the first store.
    pub fn set_storage(&mut self, name: &str, storage: PointerValue<'ll>) {
        if let Some(symbol) = self.lookup_mut(name) {
            symbol.storage = Some(storage);
        }
    }

    /// Mark a symbol initialized without touching its storage.
    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(symbol) = self.lookup_mut(name) {
            symbol.initialized = true;
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desim_ir::Pos;
    use pretty_assertions::assert_eq;

    #[test]
    fn redeclaration_fails_and_keeps_original() {
        let mut table = SymbolTable::new();
        table.add("x", DataType::Int).expect("first declaration");
        let err = table.add("x", DataType::Real).expect_err("redeclaration");
        assert_eq!(err, CodegenError::redeclaration("x"));

        let symbol = table.lookup("x").expect("x still bound");
        assert_eq!(symbol.ty, DataType::Int);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lookup_is_none_for_unknown_names() {
        let table = SymbolTable::new();
        assert!(table.lookup("ghost").is_none());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut table = SymbolTable::new();
        table.add("a", DataType::Int).expect("a");
        table.add("b", DataType::Real).expect("b");
        table.add_function("f", DataType::Void, vec![]).expect("f");
        assert_eq!(table.len(), 3);
        assert!(table.lookup("f").is_some());
    }

    #[test]
    fn class_child_tables_are_independent() {
        let mut table = SymbolTable::new();
        table.add_class("Server", Some("Resource")).expect("class");

        let Some(symbol) = table.lookup_mut("Server") else {
            panic!("class not found");
        };
        let SymbolInfo::Class {
            parent,
            members,
            methods,
        } = &mut symbol.info
        else {
            panic!("not a class symbol");
        };

        assert_eq!(parent.as_deref(), Some("Resource"));
        members.add_member("capacity", DataType::Int).expect("member");
        methods
            .add_method(
                "serve",
                DataType::Void,
                vec![Param {
                    name: "job".to_owned(),
                    ty: DataType::Int,
                    pos: Pos::default(),
                }],
            )
            .expect("method");

        // The same name may exist in both child tables, but not twice in one.
        members.add_member("serve", DataType::Int).expect("member named like method");
        assert!(methods.add_method("serve", DataType::Int, vec![]).is_err());
    }

    #[test]
    fn mark_initialized_flips_flag() {
        let mut table = SymbolTable::new();
        table.add("x", DataType::Int).expect("x");
        assert!(!table.lookup("x").expect("x").initialized);
        table.mark_initialized("x");
        assert!(table.lookup("x").expect("x").initialized);
    }
}
