use crate::db;
use crate::db::tags::TagRecord;
use crate::error::Error;
use crate::state::AppState;

pub async fn all_tags(state: &AppState) -> Result<Vec<TagRecord>, Error> {
    let tags = db::tags::list_tags(&state.db)
        .await
        .map_err(Error::db("list tags"))?;
    log::info!("all_tags result={}", tags.len());
    Ok(tags)
}

/// Create a tag; an existing tag with the same name comes back inside
/// [`Error::TagExists`].
pub async fn create_tag(state: &AppState, name: &str, color: &str) -> Result<TagRecord, Error> {
    if let Some(existing) = db::tags::find_tag_by_name(&state.db, name)
        .await
        .map_err(Error::db("look up tag by name"))?
    {
        return Err(Error::TagExists {
            existing: Box::new(existing),
        });
    }

    let id = match db::tags::insert_tag(&state.db, name, color).await {
        Ok(id) => id,
        Err(err) if db::is_unique_violation(&err) => {
            if let Some(existing) = db::tags::find_tag_by_name(&state.db, name)
                .await
                .map_err(Error::db("look up tag by name"))?
            {
                return Err(Error::TagExists {
                    existing: Box::new(existing),
                });
            }
            return Err(Error::db("insert tag")(err));
        }
        Err(err) => return Err(Error::db("insert tag")(err)),
    };

    let tag = db::tags::get_tag(&state.db, id)
        .await
        .map_err(Error::db("load inserted tag"))?
        .ok_or(Error::NotFound { what: "tag", id })?;
    log::info!("create_tag name={name} color={color} id={id}");
    Ok(tag)
}

pub async fn update_tag(state: &AppState, id: i64, name: &str, color: &str) -> Result<(), Error> {
    let updated = db::tags::update_tag(&state.db, id, name, color)
        .await
        .map_err(Error::db("update tag"))?;
    if !updated {
        return Err(Error::NotFound { what: "tag", id });
    }
    log::info!("update_tag id={id} name={name} color={color}");
    Ok(())
}

pub async fn delete_tag(state: &AppState, id: i64) -> Result<(), Error> {
    let tag = db::tags::get_tag(&state.db, id)
        .await
        .map_err(Error::db("load tag"))?
        .ok_or(Error::NotFound { what: "tag", id })?;

    db::tags::delete_tag(&state.db, id)
        .await
        .map_err(Error::db("delete tag"))?;
    log::info!("delete_tag id={id} name={}", tag.name);
    Ok(())
}

pub async fn add_tag_to_video(state: &AppState, video_id: i64, tag_id: i64) -> Result<(), Error> {
    db::videos::get_video(&state.db, video_id)
        .await
        .map_err(Error::db("load video"))?
        .ok_or(Error::NotFound {
            what: "video",
            id: video_id,
        })?;
    db::tags::get_tag(&state.db, tag_id)
        .await
        .map_err(Error::db("load tag"))?
        .ok_or(Error::NotFound {
            what: "tag",
            id: tag_id,
        })?;

    db::tags::add_association(&state.db, video_id, tag_id)
        .await
        .map_err(Error::db("add tag association"))?;
    log::info!("add_tag_to_video video_id={video_id} tag_id={tag_id}");
    Ok(())
}

pub async fn remove_tag_from_video(
    state: &AppState,
    video_id: i64,
    tag_id: i64,
) -> Result<(), Error> {
    db::videos::get_video(&state.db, video_id)
        .await
        .map_err(Error::db("load video"))?
        .ok_or(Error::NotFound {
            what: "video",
            id: video_id,
        })?;
    db::tags::get_tag(&state.db, tag_id)
        .await
        .map_err(Error::db("load tag"))?
        .ok_or(Error::NotFound {
            what: "tag",
            id: tag_id,
        })?;

    db::tags::remove_association(&state.db, video_id, tag_id)
        .await
        .map_err(Error::db("remove tag association"))?;
    log::info!("remove_tag_from_video video_id={video_id} tag_id={tag_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::local::open_test_pool;
    use crate::db::videos::tests::insert_video_row;

    async fn test_state() -> AppState {
        AppState::new(open_test_pool().await)
    }

    #[tokio::test]
    async fn duplicate_tag_name_returns_existing() {
        let state = test_state().await;
        let tag = create_tag(&state, "sport", "#fff").await.unwrap();

        let err = create_tag(&state, "sport", "#000").await.unwrap_err();
        let Error::TagExists { existing } = err else {
            panic!("expected TagExists");
        };
        assert_eq!(existing.id, tag.id);
    }

    #[tokio::test]
    async fn tag_names_are_case_sensitive() {
        let state = test_state().await;
        create_tag(&state, "Sport", "#fff").await.unwrap();
        create_tag(&state, "sport", "#fff").await.unwrap();
        assert_eq!(all_tags(&state).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn association_requires_both_sides_to_exist() {
        let state = test_state().await;
        let video = insert_video_row(&state.db, "a.mp4", "/v/a.mp4", 1, 0, 0).await;
        let tag = create_tag(&state, "sport", "#fff").await.unwrap();

        add_tag_to_video(&state, video, tag.id).await.unwrap();

        let err = add_tag_to_video(&state, video, 999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { what: "tag", id: 999 }));
        let err = add_tag_to_video(&state, 999, tag.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { what: "video", id: 999 }));
    }

    #[tokio::test]
    async fn update_missing_tag_is_not_found() {
        let state = test_state().await;
        let err = update_tag(&state, 42, "x", "#fff").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { what: "tag", id: 42 }));
    }
}
