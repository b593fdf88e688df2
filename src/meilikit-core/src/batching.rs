use crate::error::ValidationError;

/// Split `items` into ordered batches of at most `batch_size` elements.
///
/// The batches cover the input exactly once; only the last one can be short.
pub fn batches<T>(items: &[T], batch_size: usize) -> Result<Vec<&[T]>, ValidationError> {
    if batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize);
    }

    Ok(items.chunks(batch_size).collect())
}

/// Flatten per-file document lists into one list, keeping file order
pub fn combine_documents<T>(per_file: Vec<Vec<T>>) -> Vec<T> {
    per_file.into_iter().flatten().collect()
}
