mod test_classes;
