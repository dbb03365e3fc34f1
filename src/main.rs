use clap::{Arg, ArgAction, Command};
use serde::Serialize;
use anyhow::{anyhow, Result};
use std::time::Instant;

use gemm_bitserial::gemm::{default_tuning, gemm_bit_serial, GemmContext};
use gemm_bitserial::random::random_matrix;
use gemm_bitserial::Backend;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let matches = Command::new("gemm-bitserial")
        .version("0.1.0")
        .about("Bit-serial GEMM test harness: shape/bit-width driven info, round-trip, and timing checks")
        .subcommand(
            Command::new("info")
                .about("Resolve a backend and report the block sizes the solver chose for a shape")
                .arg(shape_arg("lhs-rows", "Number of LHS rows"))
                .arg(shape_arg("depth", "Shared inner dimension"))
                .arg(shape_arg("rhs-rows", "Number of RHS rows"))
                .arg(bits_arg("lhs-bits", "LHS precision in bits"))
                .arg(bits_arg("rhs-bits", "RHS precision in bits"))
                .arg(signed_arg("lhs-signed"))
                .arg(signed_arg("rhs-signed"))
                .arg(backend_arg()),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Generate a random matrix, import then export it, and verify equality")
                .arg(shape_arg("rows", "Number of rows"))
                .arg(shape_arg("cols", "Number of columns"))
                .arg(bits_arg("bits", "Precision in bits"))
                .arg(signed_arg("signed"))
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("bench")
                .about("Time a single bit-serial GEMM call for a given shape")
                .arg(shape_arg("lhs-rows", "Number of LHS rows"))
                .arg(shape_arg("depth", "Shared inner dimension"))
                .arg(shape_arg("rhs-rows", "Number of RHS rows"))
                .arg(bits_arg("lhs-bits", "LHS precision in bits"))
                .arg(bits_arg("rhs-bits", "RHS precision in bits"))
                .arg(signed_arg("lhs-signed"))
                .arg(signed_arg("rhs-signed"))
                .arg(backend_arg())
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("info", sub)) => handle_info(sub),
        Some(("roundtrip", sub)) => handle_roundtrip(sub),
        Some(("bench", sub)) => handle_bench(sub),
        _ => {
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn shape_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .default_value("64")
        .value_parser(clap::value_parser!(usize))
}

fn bits_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .default_value("8")
        .value_parser(clap::value_parser!(usize))
}

fn signed_arg(name: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue)
}

fn backend_arg() -> Arg {
    Arg::new("backend")
        .long("backend")
        .value_parser(["auto", "generic", "avx2", "avx512"])
        .default_value("auto")
}

fn parse_backend(matches: &clap::ArgMatches) -> Backend {
    match matches.get_one::<String>("backend").map(String::as_str) {
        Some("generic") => Backend::Generic,
        Some("avx2") => Backend::Avx2,
        Some("avx512") => Backend::Avx512,
        _ => Backend::AutoDetect,
    }
}

#[derive(Serialize)]
struct InfoReport {
    resolved_backend: String,
    lhs_block: usize,
    rhs_block: usize,
    depth_aligned: usize,
}

fn handle_info(matches: &clap::ArgMatches) -> Result<()> {
    let lhs_rows = *matches.get_one::<usize>("lhs-rows").unwrap();
    let depth = *matches.get_one::<usize>("depth").unwrap();
    let rhs_rows = *matches.get_one::<usize>("rhs-rows").unwrap();
    let lhs_bits = *matches.get_one::<usize>("lhs-bits").unwrap();
    let rhs_bits = *matches.get_one::<usize>("rhs-bits").unwrap();
    let lhs_signed = matches.get_flag("lhs-signed");
    let rhs_signed = matches.get_flag("rhs-signed");
    let backend = parse_backend(matches).resolve();

    let ctx = GemmContext::alloc(lhs_rows, depth, rhs_rows, lhs_bits, rhs_bits, lhs_signed, rhs_signed, backend)
        .map_err(|e| anyhow!("{e}"))?;

    let tuning = default_tuning(backend);
    let report = InfoReport {
        resolved_backend: backend.to_string(),
        lhs_block: ctx.block_sizes().lhs_block,
        rhs_block: ctx.block_sizes().rhs_block,
        depth_aligned: gemm_bitserial::align::align_to(depth, tuning.m_depth * 64),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_roundtrip(matches: &clap::ArgMatches) -> Result<()> {
    let rows = *matches.get_one::<usize>("rows").unwrap();
    let cols = *matches.get_one::<usize>("cols").unwrap();
    let bits = *matches.get_one::<usize>("bits").unwrap();
    let signed = matches.get_flag("signed");
    let seed = *matches.get_one::<u64>("seed").unwrap();

    let src = random_matrix(rows, cols, bits, signed, seed);
    let mut bsm = gemm_bitserial::BitSerialMatrix::alloc(bits, rows, cols, signed, 1, 64)
        .map_err(|e| anyhow!("{e}"))?;
    bsm.import_regular(&src, false);
    let mut dst = vec![0i32; rows * cols];
    bsm.export_regular(&mut dst, false);

    if src == dst {
        println!("roundtrip OK ({rows}x{cols}, {bits} bits, signed={signed})");
        Ok(())
    } else {
        Err(anyhow!("roundtrip mismatch for seed {seed}"))
    }
}

#[derive(Serialize)]
struct BenchReport {
    resolved_backend: String,
    lhs_rows: usize,
    depth: usize,
    rhs_rows: usize,
    elapsed_micros: u128,
}

fn handle_bench(matches: &clap::ArgMatches) -> Result<()> {
    let lhs_rows = *matches.get_one::<usize>("lhs-rows").unwrap();
    let depth = *matches.get_one::<usize>("depth").unwrap();
    let rhs_rows = *matches.get_one::<usize>("rhs-rows").unwrap();
    let lhs_bits = *matches.get_one::<usize>("lhs-bits").unwrap();
    let rhs_bits = *matches.get_one::<usize>("rhs-bits").unwrap();
    let lhs_signed = matches.get_flag("lhs-signed");
    let rhs_signed = matches.get_flag("rhs-signed");
    let backend = parse_backend(matches).resolve();
    let seed = *matches.get_one::<u64>("seed").unwrap();

    let mut ctx = GemmContext::alloc(lhs_rows, depth, rhs_rows, lhs_bits, rhs_bits, lhs_signed, rhs_signed, backend)
        .map_err(|e| anyhow!("{e}"))?;

    let lhs_src = random_matrix(lhs_rows, depth, lhs_bits, lhs_signed, seed);
    let rhs_src = random_matrix(rhs_rows, depth, rhs_bits, rhs_signed, seed.wrapping_add(1));
    ctx.lhs_mut().import_regular(&lhs_src, false);
    ctx.rhs_mut().import_regular(&rhs_src, false);

    let start = Instant::now();
    gemm_bit_serial(&mut ctx);
    let elapsed = start.elapsed();

    let report = BenchReport {
        resolved_backend: backend.to_string(),
        lhs_rows,
        depth,
        rhs_rows,
        elapsed_micros: elapsed.as_micros(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
