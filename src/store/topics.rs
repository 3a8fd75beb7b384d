//! Topic Aggregator: batch-resolves topic names for a set of problem ids.

use sqlx::{QueryBuilder, Sqlite};
use tracing::instrument;

use super::{ProblemStore, TopicMap};
use crate::error::Result;

// Stay well below SQLite's bound-parameter limit.
const MAX_IDS_PER_QUERY: usize = 500;

impl ProblemStore {
  /// Topic names per problem id, each list ordered by name.
  ///
  /// Every requested id is present in the result (empty list when the problem has no
  /// topics). A page of ids costs one query, not one per problem.
  #[instrument(level = "debug", skip(self, ids), fields(ids = ids.len()))]
  pub async fn topics_for(&self, ids: &[i64]) -> Result<TopicMap> {
    let mut out: TopicMap = ids.iter().map(|&id| (id, Vec::new())).collect();

    for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
      let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT pt.problem_id, t.name FROM problem_topics pt \
         JOIN topics t ON t.id = pt.topic_id \
         WHERE pt.problem_id IN (",
      );
      let mut list = qb.separated(", ");
      for id in chunk {
        list.push_bind(*id);
      }
      list.push_unseparated(")");
      qb.push(" ORDER BY pt.problem_id, t.name");

      let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
      for (problem_id, name) in rows {
        out.entry(problem_id).or_default().push(name);
      }
    }

    Ok(out)
  }
}
