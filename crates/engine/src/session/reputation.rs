pub const REPUTATION_MIN: i32 = 0;
pub const REPUTATION_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reputation(i32);

impl Reputation {
    pub fn new(value: i32) -> Self {
        Self(value.clamp(REPUTATION_MIN, REPUTATION_MAX))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn raise(&mut self, amount: i32) {
        *self = Self::new(self.0.saturating_add(amount));
    }

    pub fn lower(&mut self, amount: i32) {
        *self = Self::new(self.0.saturating_sub(amount));
    }
}
