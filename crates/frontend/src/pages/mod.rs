pub mod vacancy_map;
