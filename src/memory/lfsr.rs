/*
 * 16-bit Fibonacci LFSR
 *
 * Taps 16, 14, 13, 11 (x^16 + x^14 + x^13 + x^11 + 1): maximal length,
 * period 65535, never reaches zero from a non-zero seed.
 *
 * The whole state is the 16-bit register, so saving `state()` and later
 * calling `set_state()` replays exactly the same sequence on any target.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lfsr16 {
    state: u16,
}

impl Lfsr16 {
    pub const fn new(seed: u16) -> Self {
        Self { state: seed }
    }

    /// Advance one step and return the new register value.
    pub fn next_u16(&mut self) -> u16 {
        let s = self.state;
        let bit = (s ^ (s >> 2) ^ (s >> 3) ^ (s >> 5)) & 1;
        self.state = (s >> 1) | (bit << 15);
        self.state
    }

    /// Low byte of the next value.
    pub fn next_byte(&mut self) -> u8 {
        self.next_u16() as u8
    }

    pub const fn state(&self) -> u16 {
        self.state
    }

    pub fn set_state(&mut self, state: u16) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_values_from_default_seed() {
        let mut lfsr = Lfsr16::new(0xACE1);
        let got: [u16; 5] = core::array::from_fn(|_| lfsr.next_u16());
        assert_eq!(got, [0x5670, 0xAB38, 0x559C, 0x2ACE, 0x1567]);
    }

    #[test]
    fn period_is_maximal() {
        let mut lfsr = Lfsr16::new(0xACE1);
        let mut steps = 0u32;
        loop {
            steps += 1;
            if lfsr.next_u16() == 0xACE1 {
                break;
            }
        }
        assert_eq!(steps, 65535);
    }

    #[test]
    fn restoring_state_replays_sequence() {
        let mut lfsr = Lfsr16::new(0xACE1);
        lfsr.next_u16();
        let snapshot = lfsr.state();
        let first: [u8; 16] = core::array::from_fn(|_| lfsr.next_byte());
        lfsr.next_u16();
        lfsr.set_state(snapshot);
        let again: [u8; 16] = core::array::from_fn(|_| lfsr.next_byte());
        assert_eq!(first, again);
    }
}
