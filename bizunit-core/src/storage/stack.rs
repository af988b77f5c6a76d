use crate::value::{Value, ValueMap};

/// Nested variable frames. The root frame always exists; lookups search inner to outer.
#[derive(Debug, Clone, PartialEq)]
pub struct StackManager {
    frames: Vec<ValueMap>,
}

impl Default for StackManager {
    fn default() -> Self {
        Self {
            frames: vec![ValueMap::new()],
        }
    }
}

impl StackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(ValueMap::new());
    }

    /// Pops the innermost frame. The root frame is never popped.
    pub fn pop_frame(&mut self) -> Option<ValueMap> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declare `name` in the innermost frame, shadowing outer frames.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Overwrite `name` in the nearest frame that declares it; falls back to the innermost frame.
    pub fn assign(&mut self, name: &str, value: Value) {
        match self.lookup_mut(name) {
            Some(slot) => *slot = value,
            None => self.set(name, value),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.frames.iter_mut().rev().find_map(|frame| frame.get_mut(name))
    }

    pub fn frames(&self) -> &[ValueMap] {
        &self.frames
    }
}
