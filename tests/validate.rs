use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use corebench::{
    bench::{benchmark, BenchConfig, ScoringPolicy, Separation},
    core::{Core, CoreConfig, Outcome, Placement},
    load_file::{Dialect, Warrior},
    optimize::{OptConfig, Optimizer},
    parser,
};

fn load(name: &str) -> Warrior {
    // Workaround for the fact that `test_resources` paths are based on workspace Cargo.toml
    // https://github.com/frehberg/test-generator/issues/6
    let input_file = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata/input")
        .join(name);

    let input = fs::read_to_string(input_file).unwrap();
    parser::parse(&input).unwrap()
}

fn short_rounds(rounds: u32) -> BenchConfig {
    BenchConfig {
        core: CoreConfig {
            max_cycles: 10_000,
            ..CoreConfig::default()
        },
        rounds,
        seed: 1234,
        ..BenchConfig::default()
    }
}

#[test]
fn validate_dwarf() {
    let dwarf = load("dwarf.red");
    assert_eq!(dwarf.metadata.name.as_deref(), Some("Dwarf"));
    assert_eq!(
        dwarf.metadata.strategy.as_deref(),
        Some("Bombs every fourth instruction.")
    );

    let mut core = Core::new(CoreConfig {
        core_size: 8_000,
        max_cycles: 10_000,
        ..CoreConfig::default()
    })
    .unwrap();
    let result = core
        .run_round(&[dwarf], &Placement::new(vec![0]))
        .unwrap()
        .clone();

    eprintln!("After run:\n{:?}\n==============================", core);

    // a lone dwarf never bombs itself
    assert_eq!(result.outcomes, vec![Outcome::Win]);
    assert_eq!(result.cycles, 10_000);
}

#[test]
fn dwarf_beats_a_sitting_duck() {
    let warriors = vec![load("dwarf.red"), parser::parse("dat #0, #0").unwrap()];
    let score = benchmark(&warriors, &short_rounds(25)).unwrap();

    assert_eq!(score.tallies[0].wins, 25);
    assert_eq!(score.tallies[1].losses, 25);
}

#[test]
fn imps_tie_against_themselves() {
    let warriors = vec![load("imp.red"), load("imp.red")];
    let config = BenchConfig {
        separation: Separation::Fixed(4000),
        ..short_rounds(10)
    };
    let score = benchmark(&warriors, &config).unwrap();

    assert_eq!(score.tallies[0].ties, 10);
    assert_eq!(score.tallies[1].ties, 10);
    assert_eq!(score.score(0, ScoringPolicy::default()), 10);
}

#[test]
fn benchmark_is_reproducible() {
    let warriors = vec![load("dwarf.red"), load("imp.red"), load("equates.red")];
    let config = short_rounds(20);

    let first = benchmark(&warriors, &config).unwrap();
    let second = benchmark(&warriors, &config).unwrap();
    let parallel = benchmark(
        &warriors,
        &BenchConfig {
            parallel: true,
            ..config
        },
    )
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, parallel);
    for tally in &first.tallies {
        assert_eq!(tally.rounds(), 20);
    }
}

#[test]
fn optimizer_agrees_with_benchmark() {
    let candidate = load("dwarf.red");
    let references = vec![load("imp.red"), load("equates.red")];
    let config = short_rounds(15);

    let mut optimizer = Optimizer::new(OptConfig {
        core: config.core.clone(),
        rounds: config.rounds,
        seed: config.seed,
        ..OptConfig::default()
    })
    .unwrap();
    let scores = optimizer.score_against(&candidate, &references).unwrap();

    let mut total = 0;
    for (reference, record) in references.iter().zip(&scores.records) {
        let score = benchmark(&[candidate.clone(), reference.clone()], &config).unwrap();
        assert_eq!(record.wins, score.tallies[0].wins);
        assert_eq!(record.losses, score.tallies[0].losses);
        assert_eq!(record.ties, score.tallies[0].ties);
        total += score.score(0, ScoringPolicy::default());
    }
    assert_eq!(scores.total(), total);
}

#[test]
fn icws88_battle() {
    let dwarf = parser::compile(
        "
        add #4, 3
        mov 2, @2
        jmp -2
        dat #0
        ",
        Dialect::Icws88,
        8000,
    )
    .unwrap();
    let imp = parser::compile("mov 0, 1", Dialect::Icws88, 8000).unwrap();

    let config = BenchConfig {
        core: CoreConfig {
            dialect: Dialect::Icws88,
            ..short_rounds(1).core
        },
        ..short_rounds(10)
    };
    let score = benchmark(&[dwarf, imp], &config).unwrap();
    assert_eq!(score.rounds, 10);

    // newer warriors cannot run in an '88 core
    let p_space = parser::compile("ldp.ab #0, #0", Dialect::Icws94, 8000).unwrap();
    assert!(benchmark(&[p_space.clone(), p_space], &config).is_err());
}
