use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{BoundingBox, Element, NewElement};
use super::{affected, exists, require, CatalogStore};
use crate::error::{CatalogError, Result};

pub(crate) const ELEMENT_COLUMNS: &str =
    "id, slide_id, element_type, bbox_x, bbox_y, bbox_w, bbox_h";

pub(crate) fn map_element(row: &Row) -> rusqlite::Result<Element> {
    Ok(Element {
        id: row.get(0)?,
        slide_id: row.get(1)?,
        element_type: row.get(2)?,
        bbox: BoundingBox {
            x: row.get(3)?,
            y: row.get(4)?,
            w: row.get(5)?,
            h: row.get(6)?,
        },
    })
}

fn load_element(conn: &Connection, id: i64) -> Result<Element> {
    conn.query_row(
        &format!("SELECT {ELEMENT_COLUMNS} FROM elements WHERE id = ?"),
        params![id],
        map_element,
    )
    .optional()?
    .ok_or(CatalogError::not_found("element", id))
}

fn validate_bbox(bbox: &BoundingBox) -> Result<()> {
    let BoundingBox { x, y, w, h } = *bbox;
    if ![x, y, w, h].iter().all(|v| v.is_finite()) {
        return Err(CatalogError::validation("bounding box values must be finite"));
    }
    if w < 0.0 || h < 0.0 {
        return Err(CatalogError::validation(format!(
            "bounding box size must not be negative, got {w}x{h}"
        )));
    }
    Ok(())
}

impl CatalogStore {
    // ============================================
    // ELEMENTS
    // ============================================

    pub fn add_element(&self, slide_id: i64, element: &NewElement) -> Result<i64> {
        let element_type = require("element type", &element.element_type)?;
        validate_bbox(&element.bbox)?;
        let bbox = element.bbox;

        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO elements (slide_id, element_type, bbox_x, bbox_y, bbox_w, bbox_h)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![slide_id, element_type, bbox.x, bbox.y, bbox.w, bbox.h],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        tracing::info!(
            "Added {} element {} to slide {} at ({}, {}) {}x{}",
            element_type,
            id,
            slide_id,
            bbox.x,
            bbox.y,
            bbox.w,
            bbox.h
        );
        Ok(id)
    }

    pub fn get_element(&self, id: i64) -> Result<Element> {
        self.read(|conn| load_element(conn, id))
    }

    pub fn get_elements_for_slide(&self, slide_id: i64) -> Result<Vec<Element>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ELEMENT_COLUMNS} FROM elements WHERE slide_id = ? ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![slide_id], map_element)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn element_exists(&self, id: i64) -> Result<bool> {
        self.read(|conn| exists(conn, "SELECT 1 FROM elements WHERE id = ?", id))
    }

    /// Write back type and bounding box; the owning slide cannot change
    pub fn update_element(&self, element: &Element) -> Result<()> {
        let element_type = require("element type", &element.element_type)?;
        validate_bbox(&element.bbox)?;
        let bbox = element.bbox;

        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE elements
                 SET element_type = ?, bbox_x = ?, bbox_y = ?, bbox_w = ?, bbox_h = ?
                 WHERE id = ?",
                params![element_type, bbox.x, bbox.y, bbox.w, bbox.h, element.id],
            )?;
            affected(rows, "element", element.id)
        })?;

        tracing::info!("Updated element {} ({})", element.id, element_type);
        Ok(())
    }

    pub fn delete_element(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let rows = tx.execute("DELETE FROM elements WHERE id = ?", params![id])?;
            affected(rows, "element", id)
        })?;

        tracing::info!("Deleted element {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::NewSlide;
    use crate::store::testing;

    fn slide(store: &CatalogStore) -> i64 {
        let project = store.create_project("Demo", "/tmp/demo").unwrap();
        let file = store.add_file(project, "a.pptx", "a.pptx", None).unwrap();
        store.add_slide(file, &NewSlide::at(0)).unwrap()
    }

    fn chart() -> NewElement {
        NewElement {
            element_type: "chart".into(),
            bbox: BoundingBox {
                x: 1.5,
                y: 2.0,
                w: 4.25,
                h: 3.0,
            },
        }
    }

    #[test]
    fn test_add_and_get_round_trip() {
        let (_dir, store) = testing::store();
        let slide_id = slide(&store);
        let new = chart();
        let id = store.add_element(slide_id, &new).unwrap();

        let element = store.get_element(id).unwrap();
        assert_eq!(element.slide_id, slide_id);
        assert_eq!(element.element_type, "chart");
        assert_eq!(element.bbox, new.bbox);
        assert_eq!(store.get_elements_for_slide(slide_id).unwrap(), vec![element]);
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let (_dir, store) = testing::store();
        let slide_id = slide(&store);
        let mut bad = chart();
        bad.bbox.w = -1.0;
        assert!(matches!(
            store.add_element(slide_id, &bad),
            Err(CatalogError::Validation(_))
        ));

        bad.bbox.w = 1.0;
        bad.bbox.h = f64::NAN;
        assert!(matches!(
            store.add_element(slide_id, &bad),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let (_dir, store) = testing::store();
        let slide_id = slide(&store);
        let id = store.add_element(slide_id, &chart()).unwrap();

        let mut element = store.get_element(id).unwrap();
        element.element_type = "table".into();
        element.bbox.h = 0.0;
        store.update_element(&element).unwrap();
        assert_eq!(store.get_element(id).unwrap(), element);

        store.delete_element(id).unwrap();
        assert!(!store.element_exists(id).unwrap());
        assert!(matches!(
            store.update_element(&element),
            Err(CatalogError::ResourceNotFound { resource: "element", .. })
        ));
    }

    #[test]
    fn test_deleting_slide_cascades_to_elements() {
        let (_dir, store) = testing::store();
        let slide_id = slide(&store);
        let id = store.add_element(slide_id, &chart()).unwrap();

        store.delete_slide(slide_id).unwrap();
        assert!(!store.element_exists(id).unwrap());
    }
}
