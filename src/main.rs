//! CIC Emulator - CLI Entry Point
//!
//! Commands:
//! - `cic-emu run <program>` - Run a ROM image, listing or ASM file
//! - `cic-emu debug <program>` - Interactive debugger
//! - `cic-emu asm <source>` - Assemble to a ROM image
//! - `cic-emu disasm <rom>` - Disassemble a ROM image
//! - `cic-emu listing <text>` - Convert a disassembly listing to a ROM image
//! - `cic-emu lockstep <program>` - Run two cores side by side

use cic::{Cpu, CpuConfig, Rom};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cic-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A phase-accurate emulator of the 4-bit lock-step authentication microcontroller")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program for a fixed number of steps
    Run {
        /// Path to the ROM image, listing (.lst) or ASM file
        program: String,
        /// Number of steps to run after reset (4 steps per instruction)
        #[arg(short, long, default_value = "1000")]
        steps: u64,
        /// Number of steps to hold reset before running
        #[arg(long, default_value = "1")]
        reset_steps: u64,
        /// Serial input pattern, repeated, e.g. "1001"
        #[arg(short, long)]
        input: Option<String>,
        /// Show one trace line per step
        #[arg(short, long)]
        trace: bool,
        /// Print trace lines as JSON objects
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Interactive debugger
    Debug {
        /// Path to the ROM image, listing or ASM file
        program: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Assemble source to a ROM image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
        /// Image size in bytes (512, 768 or 1024)
        #[arg(long, default_value = "1024")]
        size: usize,
    },
    /// Disassemble a ROM image in execution order
    Disasm {
        /// Path to the ROM image
        rom: String,
        /// Only this bank
        #[arg(short, long)]
        bank: Option<u8>,
    },
    /// Convert a disassembly listing to a 1024-byte ROM image
    Listing {
        /// Path to the listing
        listing: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run host and peripheral cores in lock step
    Lockstep {
        /// Path to the ROM image, listing or ASM file
        program: String,
        /// Number of steps to run after reset
        #[arg(short, long, default_value = "10000")]
        steps: u64,
        /// Serial input pattern, repeated, e.g. "1001"
        #[arg(short, long)]
        input: Option<String>,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Run the built-in self-test
    Test,
}

/// Core configuration flags shared by the commands that build a core.
#[derive(clap::Args)]
struct ConfigArgs {
    /// JSON file holding a CpuConfig
    #[arg(long)]
    config: Option<String>,
    /// Bank loaded by reset (overrides the config file)
    #[arg(long)]
    bank: Option<u8>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, steps, reset_steps, input, trace, json, config }) => {
            run_program(&program, steps, reset_steps, input.as_deref(), trace, json, &config);
        }
        Some(Commands::Debug { program, config }) => {
            debug_program(&program, &config);
        }
        Some(Commands::Asm { source, output, size }) => {
            assemble_file(&source, output, size);
        }
        Some(Commands::Disasm { rom, bank }) => {
            disassemble_file(&rom, bank);
        }
        Some(Commands::Listing { listing, output }) => {
            convert_listing(&listing, output);
        }
        Some(Commands::Lockstep { program, steps, input, config }) => {
            run_lockstep(&program, steps, input.as_deref(), &config);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("CIC Emulator v0.1.0");
            println!("A 4-bit lock-step microcontroller emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn load_or_exit(path: &str) -> Vec<u8> {
    match cic::load_program(path) {
        Ok(image) => {
            eprintln!("📂 Loaded {} bytes from {}", image.len(), path);
            image
        }
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn config_or_exit(args: &ConfigArgs) -> CpuConfig {
    let mut config = match &args.config {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("❌ Failed to read config: {}", e);
                    std::process::exit(1);
                }
            };
            match serde_json::from_str::<CpuConfig>(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("❌ Invalid config {}: {}", path, e);
                    std::process::exit(1);
                }
            }
        }
        None => CpuConfig::default(),
    };
    if let Some(bank) = args.bank {
        config.reset_bank = bank;
    }
    config
}

fn rom_or_exit(image: Vec<u8>) -> Rom {
    match Rom::new(image) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("❌ Bad ROM image: {}", e);
            std::process::exit(1);
        }
    }
}

/// Parse a serial input pattern like "1001" into levels.
fn parse_input(pattern: Option<&str>) -> Vec<bool> {
    let Some(pattern) = pattern else {
        return vec![false];
    };
    let bits: Vec<bool> = pattern
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '0' => false,
            '1' => true,
            other => {
                eprintln!("❌ Invalid input bit '{}' (expected 0 or 1)", other);
                std::process::exit(1);
            }
        })
        .collect();
    if bits.is_empty() {
        vec![false]
    } else {
        bits
    }
}

fn run_program(
    path: &str,
    steps: u64,
    reset_steps: u64,
    input: Option<&str>,
    trace: bool,
    json: bool,
    config: &ConfigArgs,
) {
    use cic::asm::disasm::disassemble_instruction;

    eprintln!("🔧 Running: {}", path);

    let rom = rom_or_exit(load_or_exit(path));
    let config = config_or_exit(config);
    let mut cpu = match Cpu::new(rom, config) {
        Ok(cpu) => cpu,
        Err(e) => {
            eprintln!("❌ Failed to build core: {}", e);
            std::process::exit(1);
        }
    };
    let input = parse_input(input);

    for _ in 0..reset_steps.max(1) {
        cpu.step(true, false);
    }

    for i in 0..steps {
        let data_in = input[(i as usize) % input.len()];
        let record = cpu.step(false, data_in);

        if json {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{}", line),
                Err(e) => {
                    eprintln!("❌ Failed to serialize step: {}", e);
                    std::process::exit(1);
                }
            }
        } else if trace {
            println!("{}  {}", record, disassemble_instruction(record.opcode));
        }
    }

    let snap = cpu.snapshot();
    println!();
    println!("━━━ Result ━━━");
    println!("Steps:        {}", steps);
    println!("Instructions: {}", steps / 4);
    println!("PC:           {} (bank {}, poly {:02X})", snap.pc, snap.pc.bank(), snap.pc.poly());
    println!("Phase:        {} (next {})", cpu.phase(), cpu.upcoming_phase());
    println!("Opcode:       {:02X}  {}", snap.opcode, disassemble_instruction(snap.opcode));
    println!("A:            {}", snap.regs.a);
    println!("X:            {}", snap.regs.x);
    println!("B:            {}", snap.regs.b);
    println!("Carry:        {}", snap.regs.carry as u8);
    println!("Skip:         {}", snap.skip as u8);
    println!("Serial out:   {}", cpu.serial_out() as u8);
    println!("RAM:          {}", snap.ram.cells().iter().map(|n| n.to_string()).collect::<String>());

    if cpu.illegal_count() > 0 {
        println!();
        println!("⚠️  Executed {} illegal opcode(s) as skip-and-advance.", cpu.illegal_count());
    }
}

fn debug_program(path: &str, config: &ConfigArgs) {
    #[cfg(feature = "tui")]
    {
        use cic::tui::run_debugger;

        eprintln!("🔍 Loading: {}", path);
        let rom = rom_or_exit(load_or_exit(path));
        let config = config_or_exit(config);
        let cpu = match Cpu::new(rom, config) {
            Ok(cpu) => cpu,
            Err(e) => {
                eprintln!("❌ Failed to build core: {}", e);
                std::process::exit(1);
            }
        };

        eprintln!("🚀 Launching debugger...");
        if let Err(e) = run_debugger(cpu) {
            eprintln!("❌ Debugger error: {}", e);
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "tui"))]
    {
        let _ = (path, config);
        eprintln!("❌ Built without the `tui` feature");
        std::process::exit(1);
    }
}

fn assemble_file(source_path: &str, output: Option<String>, size: usize) {
    use cic::{assemble, save_image};

    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".bin"));

    eprintln!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let program = match assemble(&source, size) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("✓ Assembled {} bytes, {} label(s)", program.image.len(), program.symbols.len());

    if let Err(e) = save_image(&out_path, &program.image) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    eprintln!("✓ Saved to {}", out_path);
}

fn disassemble_file(rom_path: &str, bank: Option<u8>) {
    use cic::asm::disasm::{disassemble, disassemble_bank};

    eprintln!("📖 Disassembling: {}", rom_path);

    let image = match cic::load_image(rom_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    let output = match bank {
        Some(bank) => disassemble_bank(&image, bank),
        None => disassemble(&image),
    };
    print!("{}", output);
}

fn convert_listing(listing_path: &str, output: Option<String>) {
    use cic::{parse_listing, save_image};

    let out_path = output.unwrap_or_else(|| format!("{}.bin", listing_path));

    eprintln!("📝 Converting: {} → {}", listing_path, out_path);

    let text = match std::fs::read_to_string(listing_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let image = match parse_listing(&text) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Listing error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = save_image(&out_path, &image) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    eprintln!("✓ Saved {} bytes to {}", image.len(), out_path);
}

fn run_lockstep(path: &str, steps: u64, input: Option<&str>, config: &ConfigArgs) {
    use cic::LockStep;

    eprintln!("🔗 Lock-step: {}", path);

    let rom = rom_or_exit(load_or_exit(path));
    let config = config_or_exit(config);
    let mut pair = match LockStep::new(rom, config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("❌ Failed to build cores: {}", e);
            std::process::exit(1);
        }
    };
    let input = parse_input(input);

    match pair.run(1, steps, &input) {
        Ok(total) => {
            println!("✓ {} steps in lock step, final PC={}", total, pair.host().pc());
        }
        Err(divergence) => {
            eprintln!("❌ {}", divergence);
            if let Ok(json) = serde_json::to_string_pretty(&*divergence.host) {
                eprintln!("host:\n{}", json);
            }
            if let Ok(json) = serde_json::to_string_pretty(&*divergence.peripheral) {
                eprintln!("peripheral:\n{}", json);
            }
            std::process::exit(1);
        }
    }
}

fn run_self_test() {
    use cic::bits::{poly_next, PolySequence};
    use cic::{LockStep, Phase, StepEvent};

    println!("━━━ CIC Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    // Test 1: Polynomial counter period
    print!("Polynomial counter period 127... ");
    let lap: Vec<u8> = PolySequence::new(0).collect();
    let mut sorted = lap.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if lap.len() == 127 && sorted.len() == 127 && poly_next(0x7F) == 0x7F {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 2: Four steps per instruction
    print!("Four phases per instruction... ");
    let mut image = vec![0u8; 512];
    image[0x00] = 0x35; // LAI 5
    let mut cpu = match Cpu::from_image(image) {
        Ok(cpu) => cpu,
        Err(e) => {
            println!("✗ ({})", e);
            std::process::exit(1);
        }
    };
    cpu.step(true, false);
    let phases: Vec<Phase> = (0..4).map(|_| cpu.clock().phase).collect();
    if phases == Phase::ALL[1..].iter().copied().chain([Phase::Load]).collect::<Vec<_>>()
        && cpu.accumulator().value() == 5
        && cpu.pc().value() == 0x40
    {
        println!("✓");
        passed += 1;
    } else {
        println!("✗ (phases {:?}, A={}, PC={})", phases, cpu.accumulator(), cpu.pc());
        failed += 1;
    }

    // Test 3: Add overflow raises skip
    print!("Add overflow skips next... ");
    let mut image = vec![0u8; 512];
    image[0x00] = 0x3F; // LAI F
    image[0x40] = 0x01; // ADI 1
    image[0x60] = 0x35; // LAI 5 (skipped)
    image[0x70] = 0x37; // LAI 7
    let mut cpu = match Cpu::from_image(image) {
        Ok(cpu) => cpu,
        Err(e) => {
            println!("✗ ({})", e);
            std::process::exit(1);
        }
    };
    cpu.step(true, false);
    for _ in 0..16 {
        cpu.clock();
    }
    if cpu.accumulator().value() == 7 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗ (got A={}, expected 7)", cpu.accumulator());
        failed += 1;
    }

    // Test 4: Illegal opcodes are total
    print!("Illegal opcodes skip and advance... ");
    let mut cpu = match Cpu::from_image(vec![0xC3; 512]) {
        Ok(cpu) => cpu,
        Err(e) => {
            println!("✗ ({})", e);
            std::process::exit(1);
        }
    };
    cpu.step(true, false);
    let illegal = cpu
        .step_instruction()
        .iter()
        .any(|r| matches!(r.event, Some(StepEvent::IllegalOpcode { .. })));
    if illegal && cpu.skip() && cpu.pc().value() == 0x40 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    // Test 5: Lock-step agreement
    print!("Lock-step 10000 steps... ");
    let image: Vec<u8> = (0..1024u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8).collect();
    let result = Rom::new(image)
        .map_err(cic::ConfigError::from)
        .and_then(|rom| LockStep::new(rom, CpuConfig::default()));
    match result.map(|mut pair| pair.run(1, 10_000, &[true, false])) {
        Ok(Ok(_)) => {
            println!("✓");
            passed += 1;
        }
        Ok(Err(d)) => {
            println!("✗ ({})", d);
            failed += 1;
        }
        Err(e) => {
            println!("✗ ({})", e);
            failed += 1;
        }
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
