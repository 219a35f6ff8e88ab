use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Bilingual text indirection: one `text_contents` row + one translation per
/// language. The original (English) text doubles as the `en` translation.
pub async fn insert_bilingual(
    tx: &mut Transaction<'_, Postgres>,
    en: &str,
    vi: &str,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();

    sqlx::query("INSERT INTO text_contents (id, original_text) VALUES ($1, $2)")
        .bind(id)
        .bind(en)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO translations (text_content_id, language_id, content) VALUES ($1, 'en', $2), ($1, 'vi', $3)",
    )
    .bind(id)
    .bind(en)
    .bind(vi)
    .execute(&mut *tx)
    .await?;

    Ok(id)
}

pub async fn update_bilingual(
    tx: &mut Transaction<'_, Postgres>,
    text_content_id: Uuid,
    en: &str,
    vi: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE text_contents SET original_text = $2, updated_at = now() WHERE id = $1")
        .bind(text_content_id)
        .bind(en)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE translations SET content = $3, updated_at = now() WHERE text_content_id = $1 AND language_id = $2",
    )
    .bind(text_content_id)
    .bind("en")
    .bind(en)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE translations SET content = $3, updated_at = now() WHERE text_content_id = $1 AND language_id = $2",
    )
    .bind(text_content_id)
    .bind("vi")
    .bind(vi)
    .execute(&mut *tx)
    .await?;

    Ok(())
}

/// Delete a content row; translations cascade.
pub async fn delete_content(
    tx: &mut Transaction<'_, Postgres>,
    text_content_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM text_contents WHERE id = $1")
        .bind(text_content_id)
        .execute(&mut *tx)
        .await?;

    Ok(())
}
