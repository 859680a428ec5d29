//! Quota table, chunked sampling, merge and deduplication over a small corpus.
use std::io::Write;

use kgsample::cache::CacheService;
use kgsample::io::{read_lines, Layout, Stream};
use kgsample::lang::Lang;
use kgsample::processing::dedup::{check, dedup_set};
use kgsample::processing::harvest::{HarvestConfig, Harvester};
use kgsample::processing::merge::merge;
use kgsample::processing::partition::{partition, Chunk};
use kgsample::processing::quota::{self, QuotaConfig, Quotas};
use kgsample::remote::MemoryKb;
use kgsample::triple::DESCRIBED_HEADER;
use tempfile::tempdir;

fn corpus() -> Vec<(String, String, String)> {
    let mut triples = Vec::new();
    for i in 0..6 {
        triples.push((format!("Q{i}"), "P31".to_string(), format!("Q{}", 100 + i)));
    }
    for i in 6..10 {
        triples.push((format!("Q{i}"), "P17".to_string(), format!("Q{}", 100 + i)));
    }
    triples
}

fn knowledge() -> MemoryKb {
    let mut kb = MemoryKb::new()
        .with_label("P31", Lang::En, "instance of")
        .with_label("P17", Lang::En, "country");
    for (s, _, o) in corpus() {
        for id in [s, o] {
            let label = format!("entity {id}");
            let summary = format!("{label} is a thing. It exists.");
            kb = kb
                .with_label(&id, Lang::En, &label)
                .with_summary(&label, Lang::En, &summary);
        }
    }
    kb
}

#[test_log::test(tokio::test)]
async fn sample_merge_dedup() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("corpus.txt");
    let mut f = std::fs::File::create(&input).unwrap();
    for (s, r, o) in corpus() {
        writeln!(f, "{s}\t{r}\t{o}").unwrap();
    }

    let kb = knowledge();
    let config = QuotaConfig {
        langs: vec![Lang::En],
        top_n: 10,
        top_m: 10,
        target: 6,
        floor: 1,
        concurrency: 2,
    };
    let records = quota::build(&input, &kb, &config).await.unwrap();
    let table = dir.path().join("quotas.tsv");
    quota::write_table(&table, &records, &config.langs).unwrap();

    let quotas = Quotas::from_path(&table).unwrap();
    assert_eq!(quotas.get("P31"), Some(4));
    assert_eq!(quotas.get("P17"), Some(2));

    let layout = Layout::new(dir.path(), "kg", Lang::En, "6");
    for index in 0..2 {
        let chunk = Chunk::new(index, 2).unwrap();
        let relations = partition(quotas.relations(), chunk);
        assert_eq!(relations.len(), 1);

        let caches = CacheService::load(dir.path(), Lang::En);
        let config = HarvestConfig {
            seed: Some(index as u64),
            ..Default::default()
        };
        let mut harvester = Harvester::new(&kb, caches, Lang::En, config);
        harvester
            .run(&quotas, relations, &input, &layout.chunk_paths(index))
            .await
            .unwrap();
        harvester.save_caches().unwrap();
    }

    let merged = merge(&layout).unwrap();
    assert_eq!(
        merged,
        vec![
            (Stream::Triples, 6),
            (Stream::Labels, 6),
            (Stream::Descriptions, 7),
            (Stream::Failed, 0),
        ]
    );
    let paths = layout.merged_paths();
    let described = read_lines(&paths.descriptions).unwrap();
    assert_eq!(described[0], DESCRIBED_HEADER);
    assert_eq!(
        described.iter().filter(|l| l.as_str() == DESCRIBED_HEADER).count(),
        1
    );

    // nothing to remove yet
    assert!(dedup_set(&paths).unwrap().iter().all(|(_, n)| *n == 0));

    let first = read_lines(&paths.triples).unwrap()[0].clone();
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .open(&paths.triples)
        .unwrap();
    writeln!(f, "{first}").unwrap();

    let report = check::check_file(&paths.triples, false).unwrap();
    assert_eq!((report.total, report.duplicates), (7, 1));
    let removed = dedup_set(&paths).unwrap();
    assert_eq!(removed[0], (Stream::Triples, 1));
    assert_eq!(read_lines(&paths.triples).unwrap().len(), 6);
}
