use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use cancel_this::Cancelled;
use log::debug;

use petri_lts::analysis::{
    AnalysisError, BoundnessResult, CoverabilityGraph, PlaceBound, SmallestCycles,
    UnboundedWitness, boundness::boundness_of, check_place_bounded_with, compute_smallest_cycles,
};
use petri_lts::config::AnalysisConfig;
use petri_lts::lts::{TransitionSystem, TsDocument};
use petri_lts::net::{PetriNet, TransitionId};
use petri_lts::net::io::{read_net, write_json};
use petri_lts::options::{AnalysisKind, Options};

fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let mut args = shellwords::split(&std::env::var("PN_FLAGS").unwrap_or_default())
        .context("malformed PN_FLAGS")?;
    args.extend(std::env::args().skip(1));
    let options = Options::parse_from_args(&args)?;
    debug!("PN options: {:?}", options);

    let mut config = AnalysisConfig::load_from_file(&options.config)?;
    if options.timeout_ms.is_some() {
        config.timeout_ms = options.timeout_ms;
    }
    let net = read_net(&options.net).with_context(|| format!("failed to read net {}", options.net))?;

    let run = || run_analysis(&net, &config, &options);
    match config.timeout_ms {
        Some(ms) => cancel_this::on_timeout(Duration::from_millis(ms), || Ok::<_, Cancelled>(run()))
            .map_err(|e| anyhow!("analysis timed out: {e}"))?,
        None => run(),
    }
}

fn run_analysis(net: &PetriNet, config: &AnalysisConfig, options: &Options) -> Result<()> {
    match options.analysis {
        AnalysisKind::Bounded => match &options.place {
            Some(place) => match check_place_bounded_with(net, place, config)? {
                PlaceBound::Bounded(bound) => println!("place `{place}` is {bound}-bounded"),
                PlaceBound::Unbounded(witness) => {
                    println!("place `{place}` is unbounded");
                    if let Some(witness) = witness {
                        print_witness(net, &witness);
                    }
                }
            },
            None => {
                let graph = CoverabilityGraph::with_config(net, config)?;
                let result = boundness_of(&graph);
                match &result {
                    BoundnessResult::Bounded { bound } => {
                        println!("net `{}` is {bound}-bounded", net.name())
                    }
                    BoundnessResult::Unbounded {
                        unbounded_places,
                        witness,
                    } => {
                        let names: Vec<_> =
                            unbounded_places.iter().map(|p| net.place_name(*p)).collect();
                        println!("net `{}` is unbounded in {}", net.name(), names.join(", "));
                        print_witness(net, witness);
                    }
                }
            }
        },
        AnalysisKind::Coverability => {
            let graph = CoverabilityGraph::with_config(net, config)?;
            println!(
                "coverability graph: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
            emit(&graph.to_coverability_lts(), options)?;
        }
        AnalysisKind::Reachability => {
            let graph = CoverabilityGraph::with_config(net, config)?;
            match graph.to_reachability_lts() {
                Ok(ts) => {
                    println!("reachability graph: {} states", ts.state_count());
                    emit(&ts, options)?;
                }
                Err(AnalysisError::Unbounded(witness)) => {
                    println!("reachability graph is infinite");
                    print_witness(net, &witness);
                }
                Err(e) => return Err(e.into()),
            }
        }
        AnalysisKind::Cycles => {
            let ts = CoverabilityGraph::with_config(net, config)?.to_coverability_lts();
            let mut cycles = compute_smallest_cycles(&ts, config.cycle_mode)?;
            println!("{} smallest cycle(s)", cycles.len());
            for cycle in cycles.cycles() {
                println!("  {cycle}  {}", cycle.parikh);
            }
            for line in parikh_report(&mut cycles) {
                println!("{line}");
            }
            emit(&ts, options)?;
        }
        AnalysisKind::Deadlocks => {
            let graph = CoverabilityGraph::with_config(net, config)?;
            let deadlocks = graph.deadlocks();
            if deadlocks.is_empty() {
                println!("no dead markings");
            }
            for node in deadlocks {
                let sequence: Vec<_> = graph
                    .firing_sequence(node)
                    .into_iter()
                    .map(|t| net.transition_name(t))
                    .collect();
                if let Some(dead) = graph.node(node) {
                    println!("dead marking {:?} after [{}]", dead.marking, sequence.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn print_witness(net: &PetriNet, witness: &UnboundedWitness) {
    let names = |sequence: &[TransitionId]| -> String {
        sequence
            .iter()
            .map(|t| net.transition_name(*t))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!(
        "  fire [{}], then repeat [{}] to add {} token(s) to `{}` each time",
        names(&witness.prefix),
        names(&witness.cycle),
        witness.gain(),
        witness.place_name
    );
}

/// Result of each Parikh-vector check, followed by the pair that broke it.
fn parikh_report(cycles: &mut SmallestCycles) -> Vec<String> {
    let mut lines = Vec::new();
    let checks: [(&str, fn(&mut SmallestCycles) -> bool); 2] = [
        ("same Parikh vectors", SmallestCycles::check_same_pvs),
        (
            "same or mutually disjoint Parikh vectors",
            SmallestCycles::check_same_or_mutually_disjoint_pvs,
        ),
    ];
    for (name, check) in checks {
        let holds = check(cycles);
        lines.push(format!("{name}: {holds}"));
        if let Some((left, right)) = cycles.counter_example() {
            lines.push(format!("  counter-example: {left} / {right}"));
        }
    }
    lines
}

fn emit(ts: &TransitionSystem, options: &Options) -> Result<()> {
    if options.dot {
        println!("{}", ts.to_dot());
    }
    if let Some(path) = &options.output {
        write_json(path, &TsDocument::from_ts(ts))
            .with_context(|| format!("failed to write {path}"))?;
    }
    Ok(())
}
