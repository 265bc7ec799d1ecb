mod categories;
mod favicon;
mod links;
mod tasks;
