use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use crate::{
    error::{RuntimeError, RuntimeErrorKind},
    token::Token,
    value::RuntimeValue,
};

/// Scopes are shared: a closure keeps its defining scope alive after the
/// block that created it has exited.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    enclosing: Option<EnvRef>,
    values: FxHashMap<String, RuntimeValue>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_global() -> EnvRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// A fresh scope whose enclosing scope is `enclosing`.
    pub fn new_child(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            enclosing: Some(Rc::clone(enclosing)),
            values: FxHashMap::default(),
        }))
    }

    /// Binds `name` in this scope, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: RuntimeValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn assign(&mut self, name: &Token, value: RuntimeValue) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(undefined(name)),
        }
    }

    pub fn get(&self, name: &Token) -> Result<RuntimeValue, RuntimeError> {
        match self.values.get(&name.lexeme) {
            Some(value) => Ok(value.clone()),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined(name)),
            },
        }
    }

    pub fn get_at(
        environment: &EnvRef,
        distance: usize,
        name: &Token,
    ) -> Result<RuntimeValue, RuntimeError> {
        let scope = Self::ancestor(environment, distance).ok_or_else(|| undefined(name))?;
        let value = scope.borrow().get(name);
        value
    }

    pub fn assign_at(
        environment: &EnvRef,
        distance: usize,
        name: &Token,
        value: RuntimeValue,
    ) -> Result<(), RuntimeError> {
        let scope = Self::ancestor(environment, distance).ok_or_else(|| undefined(name))?;
        let result = scope.borrow_mut().assign(name, value);
        result
    }

    fn ancestor(environment: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut scope = Rc::clone(environment);
        for _ in 0..distance {
            let enclosing = scope.borrow().enclosing.clone()?;
            scope = enclosing;
        }
        Some(scope)
    }

    #[cfg(test)]
    fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(
        name,
        RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
    )
}
