//! String interner for source-level names.
//!
//! Uses `Rc<str>` for cheap cloning (reference count bump instead of
//! allocation). The parser is never supposed to copy a name string more than
//! once; interning gives us that guarantee without threading a lifetime
//! parameter for the source text through every pass.

use std::collections::HashSet;
use std::rc::Rc;

/// An interned name — cheap to clone, compares by pointer-identical content.
pub type Name = Rc<str>;

#[derive(Debug, Default)]
pub struct Interner {
    strings: HashSet<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a cheap-to-clone reference.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(existing) = self.strings.get(s) {
            Rc::clone(existing)
        } else {
            let rc: Rc<str> = Rc::from(s);
            self.strings.insert(Rc::clone(&rc));
            rc
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_string_shares_allocation() {
        let mut interner = Interner::new();
        let a = interner.intern("accept");
        let b = interner.intern("accept");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn interning_different_strings_does_not_share() {
        let mut interner = Interner::new();
        let a = interner.intern("accept");
        let b = interner.intern("reject");
        assert!(!Rc::ptr_eq(&a, &b));
    }
}
