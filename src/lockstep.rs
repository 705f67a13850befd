//! Lock-step pairing of two cores.
//!
//! The host and the peripheral each own a core running the same ROM. Both
//! are clocked with identical inputs and must agree on every step. The
//! first step where their state differs is reported as a [`Divergence`].

use crate::cpu::{ConfigError, Cpu, CpuConfig, Rom, RomBus, Snapshot, StepRecord};
use thiserror::Error;

/// Two independently constructed cores driven in lock step.
#[derive(Debug, Clone)]
pub struct LockStep<R: RomBus = Rom> {
    host: Cpu<R>,
    peripheral: Cpu<R>,
}

impl<R: RomBus + Clone> LockStep<R> {
    /// Build both cores from the same ROM and configuration.
    pub fn new(rom: R, config: CpuConfig) -> Result<Self, ConfigError> {
        let host = Cpu::new(rom.clone(), config)?;
        let peripheral = Cpu::new(rom, config)?;
        Ok(Self { host, peripheral })
    }
}

impl<R: RomBus> LockStep<R> {
    /// Pair two existing cores.
    pub fn from_cores(host: Cpu<R>, peripheral: Cpu<R>) -> Self {
        Self { host, peripheral }
    }

    /// Clock both cores once and compare them.
    pub fn step(&mut self, reset: bool, data_in: bool) -> Result<StepRecord, Divergence> {
        let host = self.host.step(reset, data_in);
        let peripheral = self.peripheral.step(reset, data_in);
        if host != peripheral {
            return Err(self.divergence());
        }
        let (h, p) = (self.host.snapshot(), self.peripheral.snapshot());
        if h != p {
            return Err(self.divergence());
        }
        Ok(host)
    }

    /// Hold reset for `reset_steps`, then run `steps` more with the serial
    /// input taken from `data_in` (indexed by step, wrapping).
    ///
    /// Returns the number of steps taken.
    pub fn run(&mut self, reset_steps: u64, steps: u64, data_in: &[bool]) -> Result<u64, Divergence> {
        for _ in 0..reset_steps {
            self.step(true, false)?;
        }
        for i in 0..steps {
            let bit = if data_in.is_empty() {
                false
            } else {
                data_in[(i % data_in.len() as u64) as usize]
            };
            self.step(false, bit)?;
        }
        Ok(reset_steps + steps)
    }

    pub fn host(&self) -> &Cpu<R> {
        &self.host
    }

    pub fn peripheral(&self) -> &Cpu<R> {
        &self.peripheral
    }

    pub fn host_mut(&mut self) -> &mut Cpu<R> {
        &mut self.host
    }

    pub fn peripheral_mut(&mut self) -> &mut Cpu<R> {
        &mut self.peripheral
    }

    fn divergence(&self) -> Divergence {
        let host = self.host.snapshot();
        let peripheral = self.peripheral.snapshot();
        Divergence {
            step: self.host.steps(),
            field: first_difference(&host, &peripheral),
            host: Box::new(host),
            peripheral: Box::new(peripheral),
        }
    }
}

/// Name of the first field that differs between two snapshots.
fn first_difference(a: &Snapshot, b: &Snapshot) -> &'static str {
    if a.pc != b.pc {
        "pc"
    } else if a.cycle != b.cycle {
        "phase"
    } else if a.opcode != b.opcode {
        "opcode"
    } else if a.regs.a != b.regs.a {
        "a"
    } else if a.regs.working != b.regs.working {
        "working"
    } else if a.regs.x != b.regs.x {
        "x"
    } else if a.regs.b != b.regs.b {
        "b"
    } else if a.regs.carry != b.regs.carry {
        "carry"
    } else if a.skip != b.skip {
        "skip"
    } else if a.stack != b.stack {
        "stack"
    } else if a.data_in != b.data_in {
        "data_in"
    } else if a.ram != b.ram {
        "ram"
    } else {
        "step"
    }
}

/// The two cores disagreed.
#[derive(Debug, Clone, Error)]
#[error("cores diverged at step {step} ({field}): host PC={} peripheral PC={}", .host.pc, .peripheral.pc)]
pub struct Divergence {
    pub step: u64,
    pub field: &'static str,
    pub host: Box<Snapshot>,
    pub peripheral: Box<Snapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Nibble;

    /// Deterministic filler so both sides see an arbitrary but fixed program.
    fn noisy_image(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_ten_thousand_steps_agree() {
        let rom = Rom::new(noisy_image(1024, 7)).unwrap();
        let mut pair = LockStep::new(rom, CpuConfig::default()).unwrap();
        let pattern = [true, false, false, true, true];
        assert_eq!(pair.run(3, 10_000, &pattern).unwrap(), 10_003);
        assert_eq!(pair.host().snapshot(), pair.peripheral().snapshot());
        assert!(pair.host().illegal_count() > 0);
    }

    #[test]
    fn test_divergence_detected() {
        let rom = Rom::new(noisy_image(512, 1)).unwrap();
        let mut pair = LockStep::new(rom, CpuConfig::default()).unwrap();
        pair.run(1, 20, &[]).unwrap();

        pair.peripheral_mut().ram.write(0x03, Nibble::new(0x9));

        let err = pair.step(false, false).unwrap_err();
        assert_eq!(err.step, 22);
        assert_eq!(err.field, "ram");
        assert_ne!(err.host, err.peripheral);
        assert!(err.to_string().contains("diverged at step 22"));
    }

    #[test]
    fn test_reset_resynchronises() {
        let rom = Rom::new(noisy_image(768, 3)).unwrap();
        let host = Cpu::new(rom.clone(), CpuConfig::default()).unwrap();
        let mut peripheral = Cpu::new(rom, CpuConfig::default()).unwrap();
        peripheral.regs.x = Nibble::new(0x5);

        let mut pair = LockStep::from_cores(host, peripheral);
        let err = pair.step(false, false).unwrap_err();
        assert_eq!(err.field, "x");

        pair.run(1, 500, &[false, true]).unwrap();
    }
}
