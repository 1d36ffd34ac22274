//! Symbol tables built during the load pass: line labels map to source-line
//! indices, memory labels map to base addresses. Both mappings are
//! bijective, so they are convenience wrappers around a `BiMap`, which also
//! gives duplicate rejection and reverse lookup for diagnostics.

use bimap::BiMap;

use crate::lexer::Ident;

#[derive(Debug, Default)]
pub struct SymbolTable {
  table: BiMap<Ident, usize>,
}

impl SymbolTable {
  pub fn new() -> SymbolTable {
    SymbolTable { table: BiMap::new() }
  }

  /// Binds a name. On a duplicate the table is left untouched and the
  /// original binding is returned as the error.
  pub fn bind(&mut self, name: Ident, value: usize) -> Result<(), usize> {
    if let Some(first) = self.table.get_by_left(&name) {
      return Err(*first);
    }
    self.table
      .insert_no_overwrite(name, value)
      .map_err(|(name, _)| self.table.get_by_left(&name).copied().unwrap_or(value))
  }

  pub fn get(&self, name: &Ident) -> Option<usize> {
    self.table.get_by_left(name).copied()
  }

  /// Reverse lookup, used when formatting addresses in diagnostics.
  pub fn name_of(&self, value: usize) -> Option<&Ident> {
    self.table.get_by_right(&value)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bind_and_lookup() {
    let mut table = SymbolTable::new();
    assert_eq!(table.bind(Ident::from("LOOP"), 3), Ok(()));
    assert_eq!(table.get(&Ident::from("LOOP")), Some(3));
    assert_eq!(table.name_of(3), Some(&Ident::from("LOOP")));
    assert_eq!(table.get(&Ident::from("OTHER")), None);
  }

  #[test]
  fn duplicates_keep_the_first_binding() {
    let mut table = SymbolTable::new();
    table.bind(Ident::from("X"), 1).unwrap();
    assert_eq!(table.bind(Ident::from("X"), 9), Err(1));
    assert_eq!(table.get(&Ident::from("X")), Some(1));
    assert_eq!(table.len(), 1);
  }
}
