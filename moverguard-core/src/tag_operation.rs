use serde::{Deserialize, Serialize};
use tracing::info;

use crate::library::{ApplyTags, LibraryError, MovieLibrary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOperationResult {
    pub movies_found: usize,
    pub movies_updated: usize,
}

/// Find movies carrying `search_tag_id` and, when `replace_tag_id` is set,
/// swap the tag through Radarr's bulk editor.
pub async fn run_tag_operation(
    library: &dyn MovieLibrary,
    search_tag_id: i32,
    replace_tag_id: Option<i32>,
) -> Result<TagOperationResult, LibraryError> {
    let movie_ids = library.movie_ids_for_tag(search_tag_id).await?;
    let mut result = TagOperationResult {
        movies_found: movie_ids.len(),
        movies_updated: 0,
    };

    let replace = match replace_tag_id {
        Some(replace) if replace != search_tag_id => replace,
        _ => {
            info!(
                search_tag_id,
                found = result.movies_found,
                "tag scan finished without replacement"
            );
            return Ok(result);
        }
    };

    if movie_ids.is_empty() {
        return Ok(result);
    }

    // Add first: a failure between the two edits leaves both tags.
    library
        .edit_movie_tags(movie_ids.clone(), vec![replace], ApplyTags::Add)
        .await?;
    library
        .edit_movie_tags(movie_ids, vec![search_tag_id], ApplyTags::Remove)
        .await?;
    result.movies_updated = result.movies_found;

    info!(
        search_tag_id,
        replace_tag_id = replace,
        updated = result.movies_updated,
        "tag replacement finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MockMovieLibrary;
    use mockall::Sequence;
    use mockall::predicate::{always, eq};

    #[tokio::test]
    async fn replaces_search_tag_on_every_match() {
        let mut radarr = MockMovieLibrary::new();
        radarr
            .expect_movie_ids_for_tag()
            .with(eq(4))
            .returning(|_| Ok(vec![10, 11]));
        let mut order = Sequence::new();
        radarr
            .expect_edit_movie_tags()
            .with(eq(vec![10, 11]), eq(vec![7]), eq(ApplyTags::Add))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_, _, _| Ok(()));
        radarr
            .expect_edit_movie_tags()
            .with(eq(vec![10, 11]), eq(vec![4]), eq(ApplyTags::Remove))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_, _, _| Ok(()));

        let result = run_tag_operation(&radarr, 4, Some(7)).await.unwrap();
        assert_eq!(
            result,
            TagOperationResult {
                movies_found: 2,
                movies_updated: 2
            }
        );
    }

    #[tokio::test]
    async fn without_replacement_only_counts() {
        let mut radarr = MockMovieLibrary::new();
        radarr
            .expect_movie_ids_for_tag()
            .returning(|_| Ok(vec![1, 2, 3]));
        radarr
            .expect_edit_movie_tags()
            .with(always(), always(), always())
            .never();

        let result = run_tag_operation(&radarr, 4, None).await.unwrap();
        assert_eq!(result.movies_found, 3);
        assert_eq!(result.movies_updated, 0);
    }

    #[tokio::test]
    async fn failed_add_keeps_search_tag() {
        let mut radarr = MockMovieLibrary::new();
        radarr
            .expect_movie_ids_for_tag()
            .returning(|_| Ok(vec![10]));
        radarr
            .expect_edit_movie_tags()
            .with(always(), always(), eq(ApplyTags::Add))
            .times(1)
            .returning(|_, _, _| {
                Err(LibraryError::NotConfigured { service: "radarr" })
            });
        radarr
            .expect_edit_movie_tags()
            .with(always(), always(), eq(ApplyTags::Remove))
            .never();

        let err = run_tag_operation(&radarr, 4, Some(7)).await.unwrap_err();
        assert!(matches!(err, LibraryError::NotConfigured { .. }));
    }
}
