//! pnflow 命令行：加载网定义，按序或随机发射，打印事件与终态。
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pnflow::net::io;
use pnflow::net::{Declaration, PetriNet};
use pnflow::options::Options;
use pnflow::stream::{DispatchEvent, DispatchRequest, MarkingStream};

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match Options::parse_from_args(&args) {
        Ok(options) => options,
        Err(err) => {
            // --help / --version 走 clap 自己的输出
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                let _ = clap_err.print();
                return Ok(());
            }
            return Err(anyhow::anyhow!("{err}"));
        }
    };
    run(options)
}

fn run(options: Options) -> Result<()> {
    let stem = Path::new(&options.input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("net")
        .to_string();
    let fallback = options.schema.clone().unwrap_or(stem);
    let mut net = load_net(&options.input, &fallback)?;
    if let Some(schema) = options.schema.clone() {
        net.schema = schema;
    }
    let schema = net.schema.clone();

    let mut stream = MarkingStream::new();
    stream.on_fail(|event| {
        warn!(
            "拒绝 {}::{} ×{}，候选向量 {:?}",
            event.schema, event.action, event.multiplier, event.out
        );
    });
    stream
        .register(net)
        .with_context(|| format!("Failed to register net under schema {:?}", schema))?;

    let mut events: Vec<DispatchEvent> = Vec::new();
    for action in &options.fire {
        let event = stream.dispatch(DispatchRequest::new(
            schema.clone(),
            action.clone(),
            options.multiplier,
        ))?;
        events.push(event);
    }

    if options.random > 0 {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        for _ in 0..options.random {
            let marking = stream
                .marking(&schema)
                .ok_or_else(|| anyhow::anyhow!("schema {:?} disappeared", schema))?;
            let mut enabled: Vec<String> = {
                let net = stream
                    .net(&schema)
                    .ok_or_else(|| anyhow::anyhow!("schema {:?} disappeared", schema))?;
                net.enabled_actions(&marking)
                    .into_iter()
                    .map(str::to_owned)
                    .collect()
            };
            if enabled.is_empty() {
                info!("随机游走在第 {} 步后死锁，提前停止", stream.seq());
                break;
            }
            let action = enabled.swap_remove(rng.random_range(0..enabled.len()));
            let event = stream.dispatch(DispatchRequest::new(
                schema.clone(),
                action,
                options.multiplier,
            ))?;
            events.push(event);
        }
    }

    if options.json {
        println!("{}", io::to_json_string(&events)?);
    } else {
        for event in &events {
            let status = if event.ok { "ok" } else { "refused" };
            println!(
                "[{}] {}::{} x{} {}",
                status,
                event.schema,
                event.action,
                event.multiplier,
                describe(event)
            );
        }
        if let Some(marking) = stream.marking(&schema) {
            println!("final marking {:?}", marking);
        }
    }

    if let Some(path) = &options.dot {
        let marking = stream
            .marking(&schema)
            .ok_or_else(|| anyhow::anyhow!("schema {:?} disappeared", schema))?;
        let net = stream
            .net(&schema)
            .ok_or_else(|| anyhow::anyhow!("schema {:?} disappeared", schema))?;
        net.write_dot_with_marking(path, &marking)
            .with_context(|| format!("Failed to write dot file: {:?}", path))?;
        info!("dot 导出完成: {}", path);
    }

    Ok(())
}

fn load_net(path: &str, schema: &str) -> Result<PetriNet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read net definition: {:?}", path))?;
    let net = if io::ron_path(path) {
        match io::from_ron_str::<Declaration>(&content) {
            Ok(declaration) => PetriNet::from_declaration(schema, declaration),
            Err(first) => io::from_ron_str::<PetriNet>(&content)
                .map_err(|_| first)
                .with_context(|| format!("Failed to parse net definition: {:?}", path))?,
        }
    } else {
        match io::from_json_str::<Declaration>(&content) {
            Ok(declaration) => PetriNet::from_declaration(schema, declaration),
            Err(first) => io::from_json_str::<PetriNet>(&content)
                .map_err(|_| first)
                .with_context(|| format!("Failed to parse net definition: {:?}", path))?,
        }
    };
    Ok(net)
}

fn describe(event: &DispatchEvent) -> String {
    match (&event.marking, &event.out) {
        (Some(marking), _) => format!("-> {:?}", marking),
        (None, Some(out)) => format!("candidate {:?}", out.as_slice()),
        (None, None) => "guard blocked".to_string(),
    }
}
