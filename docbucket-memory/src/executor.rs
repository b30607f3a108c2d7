use std::cmp::Ordering;

use docbucket_core::{
    document::Content,
    error::DocumentStoreResult,
    query::{SortDirection, Statement, resolve_field},
    rows::Row,
};

use crate::evaluator::{DocumentEvaluator, LikePatterns, collate};

/// Runs a statement over the documents of its keyspace.
///
/// Documents are filtered, sorted, paged and finally projected. Without an
/// `ORDER BY` rows come back in key order.
pub(crate) fn execute(
    statement: &Statement,
    documents: Vec<(String, Content)>,
) -> DocumentStoreResult<Vec<Row>> {
    let mut matched = Vec::with_capacity(documents.len());
    let mut patterns = LikePatterns::default();

    for (key, content) in documents {
        let keep = match &statement.filter {
            Some(filter) => DocumentEvaluator::new(&key, &content, &mut patterns).evaluate(filter)?,
            None => true,
        };

        if keep {
            matched.push((key, content));
        }
    }

    if !statement.sort.is_empty() {
        matched.sort_by(|(left_key, left), (right_key, right)| {
            statement
                .sort
                .iter()
                .map(|sort| {
                    let ordering = collate(
                        resolve_field(left_key, left, &sort.field).as_ref(),
                        resolve_field(right_key, right, &sort.field).as_ref(),
                    );

                    match sort.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    Ok(matched
        .into_iter()
        .skip(statement.offset.unwrap_or(0))
        .take(statement.limit.unwrap_or(usize::MAX))
        .map(|(key, content)| statement.project(&key, &content))
        .collect())
}
