//! Reads bulk provisioning rows from an uploaded workbook.
//!
//! First sheet only, header row skipped. Columns: email, name, role, department, batch,
//! academic_year, phone, roll_number, password.

use std::io::Cursor;

use calamine::{Data, DataType, Reader, Xlsx, open_workbook_from_rs};

use crate::error::{AppError, AppResult};
use crate::services::provisioning::ProvisionRow;

fn cell(row: &[Data], column: usize) -> Option<String> {
    row.get(column)
        .and_then(|cell| cell.as_string())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn row_from_cells(row: &[Data]) -> ProvisionRow {
    ProvisionRow {
        email: cell(row, 0).unwrap_or_default(),
        name: cell(row, 1).unwrap_or_default(),
        role: cell(row, 2).unwrap_or_default(),
        department: cell(row, 3),
        batch: cell(row, 4),
        academic_year: cell(row, 5),
        phone: cell(row, 6),
        roll_number: cell(row, 7),
        password: cell(row, 8),
        ..Default::default()
    }
}

/// Returns `(spreadsheet row number, row)` pairs; blank rows are skipped.
pub fn read_rows(file_data: Vec<u8>) -> AppResult<Vec<(usize, ProvisionRow)>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(file_data))
        .map_err(|e| AppError::bad_request(format!("Failed to open Excel file: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let first_sheet = sheet_names
        .first()
        .ok_or_else(|| AppError::bad_request("Excel file has no sheets"))?;

    let range = workbook
        .worksheet_range(first_sheet)
        .map_err(|e| AppError::bad_request(format!("Failed to read sheet: {}", e)))?;

    let rows = range
        .rows()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| row.iter().any(|cell| !cell.is_empty()))
        .map(|(idx, row)| (idx + 1, row_from_cells(row)))
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_cells() {
        let row = vec![
            Data::String(" Asha.Rao@uni.edu ".into()),
            Data::String("Asha Rao".into()),
            Data::String("student".into()),
            Data::String("CSE".into()),
            Data::String("CSE-A".into()),
            Data::Empty,
            Data::Float(9876543210.0),
        ];
        let parsed = row_from_cells(&row);
        assert_eq!(parsed.email, "Asha.Rao@uni.edu");
        assert_eq!(parsed.role, "student");
        assert_eq!(parsed.department.as_deref(), Some("CSE"));
        assert_eq!(parsed.batch.as_deref(), Some("CSE-A"));
        assert_eq!(parsed.academic_year, None);
        assert_eq!(parsed.phone.as_deref(), Some("9876543210"));
        assert_eq!(parsed.roll_number, None);
        assert_eq!(parsed.password, None);
    }

    #[test]
    fn test_rejects_non_workbook() {
        let result = read_rows(b"email,name,role".to_vec());
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
