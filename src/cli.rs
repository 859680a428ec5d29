//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

use crate::download::{WIKIDATA5M_TRAIN, WIKIDATA5M_URL};
use crate::io::Layout;
use crate::lang::Lang;

pub const DEFAULT_QUOTA_FILE: &str = "relation_stats_top200_en_de_ru_60k.tsv";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "kgsample",
    about = "Relation-balanced triple sampling with multilingual labels and descriptions."
)]
/// Holds every command that is callable by the `kgsample` command.
pub enum Kgsample {
    #[structopt(about = "Download and extract the Wikidata5M archive")]
    Download(Download),
    #[structopt(about = "Build the relation quota table")]
    Quotas(Quotas),
    #[structopt(about = "Sample and enrich the triples of a chunk")]
    Sample(Sample),
    #[structopt(about = "Merge chunk outputs of a language")]
    Merge(Merge),
    #[structopt(about = "Remove duplicate lines in place")]
    Dedup(Dedup),
    #[structopt(about = "Count duplicate lines without rewriting")]
    Check(Dedup),
    #[structopt(about = "Draw a smaller balanced subset of a described file")]
    Resample(Resample),
}

#[derive(Debug, StructOpt)]
pub struct Download {
    #[structopt(long, default_value = WIKIDATA5M_URL, help = "archive url")]
    pub url: String,
    #[structopt(parse(from_os_str), help = "download and extraction destination")]
    pub dst: PathBuf,
}

#[derive(Debug, StructOpt)]
/// Quota table building.
///
/// Relations are counted over the corpus; the `top-n` most frequent ones are kept if
/// labelled in every language, then the first `top-m` get quotas summing to `target`.
pub struct Quotas {
    #[structopt(long, parse(from_os_str), default_value = WIKIDATA5M_TRAIN, help = "triple corpus")]
    pub input: PathBuf,
    #[structopt(long, parse(from_os_str), default_value = DEFAULT_QUOTA_FILE, help = "quota table destination")]
    pub output: PathBuf,
    #[structopt(long, default_value = "en,de,ru", help = "comma separated languages")]
    pub langs: String,
    #[structopt(long, default_value = "1000")]
    pub top_n: usize,
    #[structopt(long, default_value = "200")]
    pub top_m: usize,
    #[structopt(long, default_value = "60000", help = "sum of quotas")]
    pub target: u64,
    #[structopt(long, default_value = "50", help = "minimum quota")]
    pub floor: u64,
    #[structopt(long, default_value = "10", help = "concurrent label lookups")]
    pub concurrency: usize,
}

#[derive(Debug, StructOpt)]
/// Sampling of a chunk.
///
/// Reruns with the same arguments resume from the existing part files.
pub struct Sample {
    #[structopt(long)]
    pub lang: Lang,
    #[structopt(long, default_value = "1", help = "number of chunks")]
    pub chunks: usize,
    #[structopt(long, default_value = "0", help = "chunk index")]
    pub chunk: usize,
    #[structopt(long, parse(from_os_str), default_value = DEFAULT_QUOTA_FILE)]
    pub quota_file: PathBuf,
    #[structopt(long, parse(from_os_str), default_value = WIKIDATA5M_TRAIN, help = "triple corpus")]
    pub input: PathBuf,
    #[structopt(long, parse(from_os_str), default_value = ".", help = "output directory")]
    pub dst: PathBuf,
    #[structopt(long, parse(from_os_str), default_value = ".", help = "cache directory")]
    pub cache_dir: PathBuf,
    #[structopt(long, default_value = Layout::DEFAULT_PREFIX, help = "output file prefix")]
    pub prefix: String,
    #[structopt(long, default_value = Layout::DEFAULT_TAG, help = "output file tag")]
    pub tag: String,
    #[structopt(long, default_value = "20", help = "concurrent requests")]
    pub concurrency: usize,
    #[structopt(long, default_value = "500000", help = "candidates drawn per relation")]
    pub pool_cap: usize,
    #[structopt(
        long,
        default_value = "900000",
        help = "failed candidates before abandoning a relation"
    )]
    pub give_up_after: usize,
    #[structopt(long, default_value = "10", help = "written triples between cache saves")]
    pub checkpoint_every: usize,
    #[structopt(long, help = "shuffling seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, StructOpt)]
pub struct Merge {
    #[structopt(long)]
    pub lang: Lang,
    #[structopt(long, parse(from_os_str), default_value = ".", help = "output directory")]
    pub dst: PathBuf,
    #[structopt(long, default_value = Layout::DEFAULT_PREFIX)]
    pub prefix: String,
    #[structopt(long, default_value = Layout::DEFAULT_TAG)]
    pub tag: String,
}

#[derive(Debug, StructOpt)]
/// Works on merged files, or on the part files of `--chunk`.
pub struct Dedup {
    #[structopt(long)]
    pub lang: Lang,
    #[structopt(long, help = "chunk index. Merged files if unset.")]
    pub chunk: Option<usize>,
    #[structopt(long, parse(from_os_str), default_value = ".", help = "output directory")]
    pub dst: PathBuf,
    #[structopt(long, default_value = Layout::DEFAULT_PREFIX)]
    pub prefix: String,
    #[structopt(long, default_value = Layout::DEFAULT_TAG)]
    pub tag: String,
}

#[derive(Debug, StructOpt)]
pub struct Resample {
    #[structopt(long, parse(from_os_str), help = "merged described file")]
    pub input: PathBuf,
    #[structopt(long, parse(from_os_str))]
    pub quota_file: PathBuf,
    #[structopt(long, parse(from_os_str))]
    pub output: PathBuf,
    #[structopt(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_defaults() {
        let opt = Kgsample::from_iter(["kgsample", "sample", "--lang", "de", "--chunks", "4", "--chunk", "3"]);
        match opt {
            Kgsample::Sample(s) => {
                assert_eq!(s.lang, Lang::De);
                assert_eq!((s.chunks, s.chunk), (4, 3));
                assert_eq!(s.pool_cap, 500_000);
                assert_eq!(s.give_up_after, 900_000);
                assert_eq!(s.checkpoint_every, 10);
                assert_eq!(s.concurrency, 20);
                assert_eq!(s.prefix, "wikidata5m_top200");
                assert_eq!(s.seed, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn quota_langs() {
        let opt = Kgsample::from_iter(["kgsample", "quotas", "--langs", "ru,en"]);
        match opt {
            Kgsample::Quotas(q) => {
                assert_eq!(Lang::parse_list(&q.langs).unwrap(), vec![Lang::Ru, Lang::En]);
                assert_eq!(q.target, 60_000);
                assert_eq!(q.output, PathBuf::from(DEFAULT_QUOTA_FILE));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_lang() {
        assert!(Kgsample::from_iter_safe(["kgsample", "merge", "--lang", "fr"]).is_err());
    }
}
