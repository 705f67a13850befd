//! End-to-end scenarios through the public API: assembled programs, held
//! reset, serial pins and long lock-step runs.

use cic::asm::disasm::disassemble_bank;
use cic::bits::{poly_next, Address, Nibble};
use cic::cpu::{Cpu, CpuConfig, Phase, Rom, StepEvent};
use cic::{assemble, parse_listing, LockStep};

fn assembled(source: &str) -> Cpu {
    let program = assemble(source, 512).unwrap();
    let mut cpu = Cpu::from_image(program.image).unwrap();
    cpu.step(true, false);
    cpu
}

/// Deterministic pseudo-random image.
fn noisy_image(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (state >> 56) as u8
        })
        .collect()
}

#[test]
fn test_reset_held_for_many_steps() {
    let mut cpu = assembled("LAI 9\nADI 3\n");
    for _ in 0..10 {
        cpu.clock();
    }
    assert_ne!(cpu.pc(), Address::zero());

    for _ in 0..5 {
        let record = cpu.step(true, true);
        assert_eq!(record.event, Some(StepEvent::Reset));
        assert_eq!(record.pc, Address::zero());
        assert_eq!(record.phase, Phase::Load);
        assert_eq!(record.a, Nibble::zero());
        assert!(!record.skip);
    }

    // Released: the program runs again from the top.
    cpu.step_instruction();
    assert_eq!(cpu.accumulator().value(), 9);
}

#[test]
fn test_add_overflow_and_no_overflow() {
    let mut cpu = assembled("LAI $F\nADI 1\nLAI 3\nADI 2\n");
    cpu.step_instruction();
    cpu.step_instruction();
    assert_eq!(cpu.accumulator().value(), 0x0);
    assert!(cpu.skip());

    // LAI 3 is skipped, so ADI 2 adds to zero.
    cpu.step_instruction();
    cpu.step_instruction();
    assert_eq!(cpu.accumulator().value(), 0x2);
    assert!(!cpu.skip());
}

#[test]
fn test_no_overflow_from_three() {
    let mut cpu = assembled("LAI 3\nADI 2\n");
    cpu.step_instruction();
    cpu.step_instruction();
    assert_eq!(cpu.accumulator().value(), 0x5);
    assert!(!cpu.skip());
}

#[test]
fn test_skip_if_equal_match_and_miss() {
    let mut cpu = assembled("LAI $A\nSKEI $A\nNOP\nSKEI 3\n");
    cpu.step_instruction();
    let records = cpu.step_instruction();
    assert!(cpu.skip());
    assert_eq!(records.last().unwrap().pc, Address::new(0x60));

    cpu.step_instruction();
    cpu.step_instruction();
    assert!(!cpu.skip());
}

#[test]
fn test_load_bl_immediate() {
    let program = assemble("", 512).unwrap();
    let mut image = program.image;
    image[0] = 0x25;
    let mut cpu = Cpu::from_image(image).unwrap();
    cpu.step(true, false);

    let records = cpu.step_instruction();
    assert_eq!(records[2].phase, Phase::Write);
    assert_eq!(records[2].b & 0x0F, 0x5);
    assert_eq!(cpu.regs.b.bl().value(), 0x5);
}

#[test]
fn test_serial_out_follows_accumulator() {
    let mut cpu = assembled("LAI 1\nLAI 2\nLAI 3\n");
    let outs: Vec<bool> = (0..3)
        .map(|_| {
            cpu.step_instruction();
            cpu.serial_out()
        })
        .collect();
    assert_eq!(outs, vec![true, false, true]);
}

#[test]
fn test_listing_runs_same_as_image() {
    let image = noisy_image(1024, 11);
    let listing: String = (0..8).map(|bank| disassemble_bank(&image, bank)).collect();
    let parsed = parse_listing(&listing).unwrap();

    let mut a = Cpu::from_image(image).unwrap();
    let mut b = Cpu::from_image(parsed).unwrap();
    a.step(true, false);
    b.step(true, false);
    for _ in 0..2_000 {
        assert_eq!(a.clock(), b.clock());
    }
}

#[test]
fn test_pc_walks_polynomial_sequence() {
    let mut cpu = Cpu::from_image(vec![0u8; 512]).unwrap();
    cpu.step(true, false);
    let mut expected = 0u8;
    for _ in 0..200 {
        assert_eq!(cpu.pc().poly(), expected);
        cpu.step_instruction();
        expected = poly_next(expected);
    }
}

#[test]
fn test_lockstep_ten_thousand_steps() {
    for (size, seed) in [(512, 1), (768, 2), (1024, 3)] {
        let rom = Rom::new(noisy_image(size, seed)).unwrap();
        let mut pair = LockStep::new(rom, CpuConfig::default()).unwrap();
        let input = [false, true, true, false, true, false, false];
        assert_eq!(pair.run(2, 10_000, &input).unwrap(), 10_002);
        assert_eq!(pair.host().snapshot(), pair.peripheral().snapshot());
    }
}

#[test]
fn test_lockstep_records_match_single_core() {
    let image = noisy_image(512, 5);
    let mut single = Cpu::from_image(image.clone()).unwrap();
    let mut pair = LockStep::new(Rom::new(image).unwrap(), CpuConfig::default()).unwrap();

    assert_eq!(pair.step(true, false).unwrap(), single.step(true, false));
    for i in 0..1_000 {
        let bit = i % 3 == 0;
        assert_eq!(pair.step(false, bit).unwrap(), single.step(false, bit));
    }
}

#[test]
fn test_lockstep_detects_tampered_peripheral() {
    let rom = Rom::new(noisy_image(512, 9)).unwrap();
    let mut pair = LockStep::new(rom, CpuConfig::default()).unwrap();
    pair.run(1, 40, &[true]).unwrap();

    pair.peripheral_mut().regs.a = Nibble::new(pair.host().accumulator().value() ^ 0x1);
    let err = pair.step(false, true).unwrap_err();
    assert_eq!(err.step, 42);
    assert_ne!(err.host, err.peripheral);
}
