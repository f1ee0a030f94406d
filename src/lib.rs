/*! Rule-based morphological segmentation for Turkish word forms.

Given a surface word, the engine recursively strips recognized suffixes to
recover a root plus an ordered suffix chain, validating every candidate
split against Turkish vowel harmony and consonant softening. Every
resolved analysis is written through to a durable SQLite cache shared
between processes, so repeated lookups are constant-time and learned roots
accumulate across runs.

# Usage example

```no_run
use kokbul::analyzer::{Analyzer, AnalyzerConfig};
use kokbul::types::PartOfSpeech;

let mut analyzer = Analyzer::open("morphology.db", AnalyzerConfig::default())?;
analyzer.register_root("ev", PartOfSpeech::Noun)?;

let analysis = analyzer.segment("evlerimizde")?;
println!("{} + {:?}", analysis.root(), analysis.suffixes());

analyzer.close()?;
# Ok::<(), kokbul::cache::StorageError>(())
```
*/

#![warn(missing_docs)]

pub mod analyzer;
pub mod backend;
pub mod cache;
pub mod lexicon;
pub mod phonology;
pub mod segmenter;
pub mod types;
