use sqlx::postgres::{PgDatabaseError, PgErrorPosition};

/// Renders a driver error for operators.
///
/// PostgreSQL errors get one labelled line per available field; anything else
/// falls back to its `Display` output.
pub fn describe_driver_error(err: &sqlx::Error) -> String {
    let Some(pg) = err
        .as_database_error()
        .and_then(|db| db.try_downcast_ref::<PgDatabaseError>())
    else {
        return err.to_string();
    };

    let mut msg = format!("Severity   : {:?}\n", pg.severity());
    msg += &format!("Error Code : {}\n", pg.code());
    msg += &format!("Message    : {}\n", pg.message());
    if let Some(detail) = pg.detail() {
        msg += &format!("Detail     : {}\n", detail);
    }
    if let Some(hint) = pg.hint() {
        msg += &format!("Hint       : {}\n", hint);
    }
    match pg.position() {
        Some(PgErrorPosition::Original(position)) => {
            msg += &format!("Position   : {}\n", position);
        }
        Some(PgErrorPosition::Internal { position, query }) => {
            msg += &format!("Position   : {} (internal query: {})\n", position, query);
        }
        None => {}
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_falls_back_to_display() {
        let err = sqlx::Error::RowNotFound;
        assert_eq!(describe_driver_error(&err), err.to_string());
    }

    #[test]
    fn test_protocol_error() {
        let err = sqlx::Error::Protocol("unexpected message".to_string());
        assert!(describe_driver_error(&err).contains("unexpected message"));
    }
}
