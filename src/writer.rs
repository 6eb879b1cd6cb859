use gag::services::PeriodLeaderboard;
use gag::{LeaderboardRow, Result};

use csv::{Writer, WriterBuilder};

pub fn build_csv_writer() -> Result<Writer<Vec<u8>>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);

    // Written up front so an empty report still carries the header
    writer.write_record(LeaderboardRow::HEADERS)?;

    return Ok(writer);
}

pub fn write_leaderboard(writer: &mut Writer<Vec<u8>>, leaderboard: &PeriodLeaderboard) -> Result {
    for row in LeaderboardRow::from_leaderboard(leaderboard) {
        log::debug!("Serializing row: {row:?}");
        writer.serialize(row)?;
    }

    return Ok(());
}

pub fn write_to_string(writer: Writer<Vec<u8>>) -> Result<String> {
    let utf8 = writer.into_inner()?;
    let string = String::from_utf8(utf8)?;
    return Ok(string);
}
