/// Pass/fail tally for either test cases or individual assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Counter {
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}
