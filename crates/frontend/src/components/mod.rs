pub mod company_card;
pub mod filter_panel;
pub mod map_fallback;
pub mod map_view;
