use chrono::{DateTime, Datelike, FixedOffset, Weekday};

use crate::models::Event;

/// Renders the notification text for one event. Every channel sends this
/// exact string, byte for byte.
pub fn render(event: &Event) -> String {
    let schedule = render_schedule(&event.started_at, &event.ended_at);
    let limit = match event.limit {
        Some(limit) => limit.to_string(),
        None => "なし".to_string(),
    };

    format!(
        "\n【タイトル】\n{title}\n\n【日時】\n{schedule}\n\n【場所】\n{address}\n\n【会場】\n{place}\n\n【定員】\n{limit}\n\n【ハッシュタグ】\n#{hash_tag}\n{url}",
        title = event.title,
        address = event.address,
        place = event.place,
        hash_tag = event.hash_tag,
        url = event.event_url,
    )
}

fn render_schedule(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> String {
    let start_date = jp_date(start);
    let start_time = start.format("%H:%M");
    let end_time = end.format("%H:%M");

    if start.date_naive() == end.date_naive() {
        format!("{start_date} {start_time} ~ {end_time}")
    } else {
        let end_date = jp_date(end);
        format!("{start_date} {start_time} ~ \n    {end_date} {end_time}\n")
    }
}

fn jp_date(ts: &DateTime<FixedOffset>) -> String {
    format!(
        "{}年{}月{}日({})",
        ts.year(),
        ts.month(),
        ts.day(),
        jp_weekday(ts.weekday())
    )
}

fn jp_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}
