use std::collections::{BTreeSet, HashMap};

use ara_denoise::{
    config::{ApiConfig, CorrectionConfig},
    correction::corrector::NoiseCorrector,
    events::{
        input::{InputBatch, InputMode, InputSources},
        join::JoinedSource,
        source::SourceType,
    },
    mechanisms::randomized_response::randomize,
    output::{output_space, Output, ReportSlot},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

mod common;
use common::{fixtures, logging};

const NUM_NAVIGATION: usize = 600;
const NUM_EVENT: usize = 300;

/// Sources whose true outputs went through the API noise.
fn noisy_sources<R: Rng>(rng: &mut R) -> anyhow::Result<Vec<JoinedSource>> {
    let config = CorrectionConfig::default();
    let mut joined = vec![];

    let navigation_universe: Vec<Output> = output_space(&config.navigation)?.collect();
    let purchase = Output::new(vec![ReportSlot::new(0, 3)]);
    let navigation_truth: Vec<Output> = (0..NUM_NAVIGATION)
        .map(|i| if i % 3 == 0 { purchase.clone() } else { Output::empty() })
        .collect();
    let noisy = randomize(
        &navigation_truth,
        &navigation_universe,
        config.navigation.flip_probability(),
        &mut *rng,
    );
    for (id, output) in noisy.iter().enumerate() {
        joined.push(fixtures::joined_with_output(id, SourceType::Navigation, output)?);
    }

    let event_universe: Vec<Output> = output_space(&config.event)?.collect();
    let event_truth: Vec<Output> = (0..NUM_EVENT)
        .map(|i| event_universe[i % event_universe.len()].clone())
        .collect();
    let noisy = randomize(
        &event_truth,
        &event_universe,
        config.event.flip_probability(),
        &mut *rng,
    );
    for (i, output) in noisy.iter().enumerate() {
        let id = NUM_NAVIGATION + i;
        joined.push(fixtures::joined_with_output(id, SourceType::Event, output)?);
    }
    Ok(joined)
}

fn to_batch(joined: &[JoinedSource]) -> InputBatch {
    InputBatch {
        input: InputSources {
            sources: joined.iter().map(|j| j.source.clone()).collect(),
        },
        reports: joined.iter().flat_map(|j| j.reports.clone()).collect(),
    }
}

fn outputs_by_id(
    joined: &[JoinedSource],
    config: &CorrectionConfig,
) -> anyhow::Result<HashMap<String, Output>> {
    joined
        .iter()
        .map(|j| -> anyhow::Result<(String, Output)> {
            let api_config = config.for_source_type(j.source.source_type);
            let output = Output::from_joined(j, api_config)?;
            Ok((j.source.source_event_id().to_string(), output))
        })
        .collect()
}

#[test]
fn parse_input_in_both_modes() -> anyhow::Result<()> {
    logging::init_default_logging();
    let mut rng = ChaCha20Rng::seed_from_u64(17);
    let joined = noisy_sources(&mut rng)?;

    let single = serde_json::to_string(&to_batch(&joined))?;
    let parsed = InputBatch::parse(InputMode::Single, &single)?;
    assert_eq!(parsed, joined);

    // One line per batch, each with its own sources and reports.
    let (navigation, event) = joined.split_at(NUM_NAVIGATION);
    let multi = format!(
        "{}\n\n{}\n",
        serde_json::to_string(&to_batch(navigation))?,
        serde_json::to_string(&to_batch(event))?
    );
    let parsed = InputBatch::parse(InputMode::Multi, &multi)?;
    assert_eq!(parsed, joined);
    Ok(())
}

#[test]
fn aggregate_correction_recovers_report_counts() -> anyhow::Result<()> {
    logging::init_default_logging();
    let mut rng = ChaCha20Rng::seed_from_u64(23);
    let joined = noisy_sources(&mut rng)?;

    let corrector = NoiseCorrector::new(CorrectionConfig::default(), rng)?;
    let aggregates = corrector.correct_aggregates(&joined)?;

    assert_eq!(aggregates.navigation.len(), 8);
    let purchases = &aggregates.navigation[3];
    assert_eq!(purchases.trigger_data, 3);
    assert!(
        (purchases.report_count - 200.0).abs() < 150.0,
        "estimated {} purchase reports",
        purchases.report_count
    );

    // Event noise is tiny, counts are almost exactly the true ones.
    assert_eq!(aggregates.event.len(), 2);
    for count in &aggregates.event {
        assert!(
            (count.report_count - 100.0).abs() < 1.0,
            "trigger data {}: {}",
            count.trigger_data,
            count.report_count
        );
    }
    Ok(())
}

#[test]
fn event_level_correction_keeps_sources_and_output_space() -> anyhow::Result<()> {
    logging::init_default_logging();
    let config = CorrectionConfig::default();
    let mut rng = ChaCha20Rng::seed_from_u64(29);
    let joined = noisy_sources(&mut rng)?;

    let mut corrector = NoiseCorrector::new(config.clone(), rng)?;
    let corrected = corrector.correct_event_level(joined.clone())?;
    assert_eq!(corrected.len(), joined.len());

    // Navigation sources come first.
    assert!(corrected[..NUM_NAVIGATION]
        .iter()
        .all(|j| j.source.source_type == SourceType::Navigation));
    assert!(corrected[NUM_NAVIGATION..]
        .iter()
        .all(|j| j.source.source_type == SourceType::Event));

    let ids = |sources: &[JoinedSource]| -> BTreeSet<String> {
        sources
            .iter()
            .map(|j| j.source.source_event_id().to_string())
            .collect()
    };
    assert_eq!(ids(&corrected[..]), ids(&joined[..]));

    // Every synthetic report maps back to a valid output of its source.
    let before = outputs_by_id(&joined, &config)?;
    let after = outputs_by_id(&corrected, &config)?;
    for j in &corrected {
        let api_config: &ApiConfig = config.for_source_type(j.source.source_type);
        assert!(after[j.source.source_event_id()].fits(api_config));
        assert!(j
            .reports
            .iter()
            .all(|r| r.source_event_id() == j.source.source_event_id()));
    }

    let unchanged_events = corrected[NUM_NAVIGATION..]
        .iter()
        .map(|j| j.source.source_event_id())
        .filter(|id| before[*id] == after[*id])
        .count();
    assert!(
        unchanged_events >= NUM_EVENT - 10,
        "only {unchanged_events} event sources unchanged"
    );

    let round_trip: Vec<JoinedSource> =
        serde_json::from_str(&serde_json::to_string(&corrected)?)?;
    assert_eq!(round_trip, corrected);
    Ok(())
}

#[test]
fn correction_config_from_json() -> anyhow::Result<()> {
    let json = serde_json::to_string(&CorrectionConfig::default())?;
    assert_eq!(
        CorrectionConfig::from_json_str(&json)?,
        CorrectionConfig::default()
    );

    let swapped = CorrectionConfig {
        navigation: ApiConfig::event(),
        event: ApiConfig::navigation(),
        beta: 0.0,
    };
    let json = serde_json::to_string(&swapped)?;
    assert!(CorrectionConfig::from_json_str(&json).is_err());
    Ok(())
}
