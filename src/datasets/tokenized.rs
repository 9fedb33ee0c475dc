use async_trait::async_trait;
use burn::data::dataset::{self, InMemDataset};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::pipelines::sentiment;

use super::LoadableDataset;

/// A pre-tokenized sentence with its sentiment class (0 = negative, 1 = positive)
#[derive(Clone, Debug, Serialize, Deserialize, new)]
pub struct Item {
    /// Token ids, each a row index into the embedding table
    pub tokens: Vec<usize>,

    /// The sentiment class id
    pub label: usize,
}

impl sentiment::Item for Item {
    fn tokens(&self) -> &[usize] {
        &self.tokens
    }

    fn label(&self) -> usize {
        self.label
    }
}

/// A JSON-lines dataset of pre-tokenized items, one `{"tokens": [...], "label": 0}` per line
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

impl Dataset {
    /// Wrap already loaded items
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }
}

/// Implement the Dataset trait for the tokenized dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

#[async_trait]
impl LoadableDataset<Item> for Dataset {
    /// Constructs the dataset for a split (e.g., "train", "dev" or "test")
    async fn load(data_dir: &str, mode: &str) -> std::io::Result<Self> {
        let path = format!("{}/{}.jsonl", data_dir, mode);

        log::info!("Loading {} split from {}", mode, path);

        let dataset = InMemDataset::from_json_rows(path)?;

        Ok(Self { dataset })
    }
}

#[cfg(test)]
mod tests {
    use burn::data::dataset::Dataset as _;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn loads_json_rows() {
        let dir = std::env::temp_dir().join(format!(
            "burn-sentiment-tokenized-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("dev.jsonl"),
            "{\"tokens\": [3, 1, 4], \"label\": 1}\n{\"tokens\": [1, 5], \"label\": 0}\n",
        )
        .unwrap();

        let dataset = Dataset::load(dir.to_str().unwrap(), "dev").await.unwrap();

        assert_eq!(dataset.len(), 2);

        let item = dataset.get(1).unwrap();
        assert_eq!(item.tokens, vec![1, 5]);
        assert_eq!(item.label, 0);
    }
}
