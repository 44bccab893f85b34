use std::collections::BTreeMap;

use batchop_exec::EngineConfig;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{OutputArgs, PoolArgs};

pub const POOL_SIZE_ENV: &str = "BATCHOP_POOL_SIZE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSizeSource {
    Flag,
    Env,
    Default,
}

/// Resolves the pool size from the flag, then `BATCHOP_POOL_SIZE`, then the
/// engine default. The result is not validated here; `Engine::new` does that.
pub fn build_engine_config(pool: &PoolArgs) -> Result<(EngineConfig, PoolSizeSource), String> {
    if let Some(pool_size) = pool.pool_size {
        return Ok((EngineConfig { pool_size }, PoolSizeSource::Flag));
    }
    match std::env::var(POOL_SIZE_ENV).ok() {
        Some(raw) => {
            let pool_size = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid {POOL_SIZE_ENV} value {raw:?}: {e}"))?;
            Ok((EngineConfig { pool_size }, PoolSizeSource::Env))
        }
        None => Ok((EngineConfig::default(), PoolSizeSource::Default)),
    }
}

/// Parses repeated `NAME=JSON` flags. A value that is not valid JSON is an
/// error rather than being treated as a bare string.
pub fn parse_payloads(raw: &[String]) -> Result<BTreeMap<String, serde_json::Value>, String> {
    let mut out = BTreeMap::new();
    for s in raw {
        let (name, json) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid --payload {s:?}: expected NAME=JSON"))?;
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| format!("invalid --payload for {name}: {e}"))?;
        if out.insert(name.to_string(), value).is_some() {
            return Err(format!("duplicate --payload for {name}"));
        }
    }
    Ok(out)
}

/// Parses repeated `NAME=OP1,OP2` flags, preserving flag order.
pub fn parse_groups(raw: &[String]) -> Result<Vec<(String, Vec<String>)>, String> {
    let mut out: Vec<(String, Vec<String>)> = Vec::new();
    for s in raw {
        let (name, ops) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid --group {s:?}: expected NAME=OP1,OP2"))?;
        let ops: Vec<String> = ops
            .split(',')
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .map(String::from)
            .collect();
        if name.is_empty() || ops.is_empty() {
            return Err(format!("invalid --group {s:?}: expected NAME=OP1,OP2"));
        }
        if out.iter().any(|(existing, _)| existing == name) {
            return Err(format!("duplicate --group {name}"));
        }
        out.push((name.to_string(), ops));
    }
    Ok(out)
}

#[derive(Serialize)]
struct ConfigResult {
    pool_size: usize,
    source: PoolSizeSource,
}

pub fn config_cmd(output: OutputArgs, pool: PoolArgs) -> i32 {
    let (config, source) = match build_engine_config(&pool) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_ARGUMENTS;
        }
    };
    if let Err(e) = config.validate() {
        print_error(output.format, output.quiet, &e.to_string());
        return exit_codes::INVALID_ARGUMENTS;
    }
    print_result(
        output.format,
        output.quiet,
        &ConfigResult {
            pool_size: config.pool_size,
            source,
        },
    );
    exit_codes::SUCCESS
}
