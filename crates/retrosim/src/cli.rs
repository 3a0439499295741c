use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::{load_table, RunConfig};

pub const USAGE: &str = "\
usage: retrosim <program.bin> [options]

options:
  --table FILE      opcode table to use instead of the built-in one
  --max-steps N     stop with an error after N instructions (default 1000000)
  --unbounded       run until BRK with no step limit
  --no-devices      leave $00FE, $00FF and $0200-$05FF as plain memory
  --reg NAME=VALUE  preset register a, x or y (decimal, 0x.. or $..)
  --key KEY         key code waiting at $00FF (a single character or a byte)
  -h, --help        show this message";

pub enum Command {
    Help,
    Run { program: PathBuf, config: RunConfig },
}

/// Parse everything after the binary name.
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut program = None;
    let mut table_path = None;
    let mut max_steps = Some(crate::DEFAULT_MAX_STEPS);
    let mut devices = true;
    let mut registers = Vec::new();
    let mut key = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--table" => table_path = Some(PathBuf::from(value_for(&mut args, &arg)?)),
            "--max-steps" => {
                let text = value_for(&mut args, &arg)?;
                let limit = text
                    .parse::<u64>()
                    .with_context(|| format!("invalid step limit '{}'", text))?;
                max_steps = Some(limit);
            }
            "--unbounded" => max_steps = None,
            "--no-devices" => devices = false,
            "--reg" => {
                let text = value_for(&mut args, &arg)?;
                let (name, value) = text
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", text))?;
                registers.push((name.trim().to_string(), parse_byte(value.trim())?));
            }
            "--key" => {
                let text = value_for(&mut args, &arg)?;
                key = Some(parse_key(&text)?);
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
            path => {
                if program.replace(PathBuf::from(path)).is_some() {
                    bail!("more than one program given");
                }
            }
        }
    }

    let program = program.ok_or_else(|| anyhow!("no program given\n\n{}", USAGE))?;
    let table = table_path.as_deref().map(load_table).transpose()?;
    let config = RunConfig {
        max_steps,
        devices,
        registers,
        table,
        key,
    };
    Ok(Command::Run { program, config })
}

fn value_for(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("option '{}' needs a value", flag))
}

fn parse_byte(text: &str) -> Result<u8> {
    let parsed = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        u8::from_str_radix(hex, 16)
    } else {
        text.parse::<u8>()
    };
    parsed.with_context(|| format!("invalid register value '{}'", text))
}

fn parse_key(text: &str) -> Result<u8> {
    match text.as_bytes() {
        [c] if !c.is_ascii_digit() => Ok(*c),
        _ => parse_byte(text),
    }
}
