// fn main not required
mod health_check;
mod helpers;
mod sitemap;
mod widget;

// one binary for all the black-box tests: each tests/*.rs file would be
// linked separately, and linking is sequential
