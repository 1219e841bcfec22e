// Telegram-flavoured HTML message bodies
use super::DailyWindow;
use crate::models::Analysis;

pub fn target_reached_message(analysis: &Analysis) -> String {
    format!(
        "🎯 <b>TARGET REACHED!</b>\n\n\
         <b>Stock:</b> {}\n\
         <b>Buy Price:</b> ${:.2}\n\
         <b>Current Price:</b> ${:.2}\n\
         <b>Target Price:</b> ${:.2}\n\
         <b>Profit:</b> ${:.2} ({:.2}%)",
        analysis.symbol,
        analysis.buy_price,
        analysis.current_price,
        analysis.target_price,
        analysis.profit,
        analysis.profit_percent
    )
}

pub fn daily_update_message(analysis: &Analysis, window: &DailyWindow) -> String {
    format!(
        "📊 <b>DAILY PRICE UPDATE ({:02}:{:02})</b>\n\n\
         <b>Stock:</b> {}\n\
         <b>Buy Price:</b> ${:.2}\n\
         <b>Current Price:</b> ${:.2}\n\
         <b>Target Price:</b> ${:.2}\n\
         <b>Profit/Loss:</b> ${:.2} ({:.2}%)",
        window.hour,
        window.minute,
        analysis.symbol,
        analysis.buy_price,
        analysis.current_price,
        analysis.target_price,
        analysis.profit,
        analysis.profit_percent
    )
}
