//! # kgsample
//!
//! Builds relation-balanced, multilingual samples of the Wikidata5M triple corpus.
//!
//! ## Getting started
//!
//! ```sh
//! kgsample download .
//! kgsample quotas --langs en,de,ru
//! kgsample sample --lang en --chunks 4 --chunk 0   # one per chunk, in parallel
//! kgsample merge --lang en
//! kgsample dedup --lang en
//! ```
//!
//! Logging is controlled through `RUST_LOG` and defaults to `info`.

use structopt::StructOpt;

#[macro_use]
extern crate log;

use kgsample::cache::CacheService;
use kgsample::cli::{self, Kgsample};
use kgsample::download;
use kgsample::error::Error;
use kgsample::io::{Layout, StreamPaths};
use kgsample::lang::Lang;
use kgsample::processing::dedup::{self, check};
use kgsample::processing::harvest::{HarvestConfig, Harvester};
use kgsample::processing::partition::{partition, Chunk};
use kgsample::processing::quota::{self, QuotaConfig, Quotas};
use kgsample::processing::{merge, resample};
use kgsample::remote::Wikidata;

fn stream_paths(opt: &cli::Dedup) -> StreamPaths {
    let layout = Layout::new(&opt.dst, &opt.prefix, opt.lang, &opt.tag);
    match opt.chunk {
        Some(chunk) => layout.chunk_paths(chunk),
        None => layout.merged_paths(),
    }
}

async fn sample(opt: cli::Sample) -> Result<(), Error> {
    let chunk = Chunk::new(opt.chunk, opt.chunks)?;
    let quotas = Quotas::from_path(&opt.quota_file)?;
    let relations = partition(quotas.relations(), chunk);
    info!(
        "[{}] chunk {}/{}: {} of {} relations",
        opt.lang,
        chunk.index(),
        chunk.count(),
        relations.len(),
        quotas.len()
    );

    std::fs::create_dir_all(&opt.dst)?;
    std::fs::create_dir_all(&opt.cache_dir)?;
    let layout = Layout::new(&opt.dst, &opt.prefix, opt.lang, &opt.tag);
    let paths = layout.chunk_paths(chunk.index());

    let kb = Wikidata::new(opt.concurrency)?;
    let caches = CacheService::load(&opt.cache_dir, opt.lang);
    let config = HarvestConfig {
        pool_cap: opt.pool_cap,
        give_up_after: opt.give_up_after,
        checkpoint_every: opt.checkpoint_every,
        seed: opt.seed,
    };

    let mut harvester = Harvester::new(&kb, caches, opt.lang, config);
    let report = harvester.run(&quotas, relations, &opt.input, &paths).await;
    // keep lookups made before a failure
    harvester.save_caches()?;
    let report = report?;

    let abandoned = report.relations.iter().filter(|r| r.abandoned).count();
    if abandoned > 0 {
        warn!("[{}] {} relations abandoned", opt.lang, abandoned);
    }
    info!(
        "[{}] chunk {} done: {} new triples in {:?}",
        opt.lang,
        chunk.index(),
        report.written(),
        paths.triples
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Kgsample::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        Kgsample::Download(d) => {
            let archive = download::fetch(&d.url, &d.dst).await?;
            info!("{:?} extracted into {:?}", archive, d.dst);
        }

        Kgsample::Quotas(q) => {
            let langs = Lang::parse_list(&q.langs)?;
            let kb = Wikidata::new(q.concurrency)?;
            let config = QuotaConfig {
                langs,
                top_n: q.top_n,
                top_m: q.top_m,
                target: q.target,
                floor: q.floor,
                concurrency: q.concurrency,
            };
            let records = quota::build(&q.input, &kb, &config).await?;
            quota::write_table(&q.output, &records, &config.langs)?;
            info!("quota table written to {:?}", q.output);
        }

        Kgsample::Sample(s) => sample(s).await?,

        Kgsample::Merge(m) => {
            let layout = Layout::new(&m.dst, &m.prefix, m.lang, &m.tag);
            merge::merge(&layout)?;
        }

        Kgsample::Dedup(d) => {
            let removed = dedup::dedup_set(&stream_paths(&d))?;
            let total: usize = removed.iter().map(|(_, n)| n).sum();
            info!("[{}] removed {} duplicate lines", d.lang, total);
        }

        Kgsample::Check(d) => {
            let paths = stream_paths(&d);
            for (stream, report) in check::check_set(&paths)? {
                println!(
                    "{}\t{}\t{}",
                    paths.get(stream).display(),
                    report.total,
                    report.duplicates
                );
            }
        }

        Kgsample::Resample(r) => {
            let quotas = Quotas::from_path(&r.quota_file)?;
            resample::resample(&r.input, &quotas, &r.output, r.seed)?;
        }
    };
    Ok(())
}
