use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// An interned string identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// String interner for scope and entity names.
///
/// A transformation run is single-threaded, so the interner is owned by the
/// run's context and mutated through `&mut self`. Symbols are handed out in
/// insertion order, which keeps anything keyed by them deterministic.
#[derive(Debug, Default)]
pub struct SymbolInterner {
    map: FxHashMap<SmolStr, Symbol>,
    strings: Vec<SmolStr>,
}

impl SymbolInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        let smol = SmolStr::new(s);
        self.strings.push(smol.clone());
        self.map.insert(smol, sym);
        sym
    }

    pub fn resolve(&self, sym: Symbol) -> Option<&SmolStr> {
        self.strings.get(sym.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
